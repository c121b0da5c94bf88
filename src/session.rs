//! Command sequencing over one opened device.

use tracing::debug;

use crate::amd_wraith_prism::{apply_frame, enable_frame, Operation};
use crate::error::Error;
use crate::transport::{hex_lines, transact, HidEndpoint};

/// Run a batch of operations against an enabled controller.
///
/// The controller is enabled first and a single commit frame follows the
/// batch once at least one state-changing operation went through. A command
/// that fails to validate stops the batch before anything is committed; a
/// transport failure stops the batch but still commits the updates the
/// device already acknowledged.
pub fn run<D, I>(device: &D, operations: I) -> Result<(), Error>
where
    D: HidEndpoint,
    I: IntoIterator<Item = Result<Operation, Error>>,
{
    debug!("enabling controller");
    transact(device, &enable_frame())?;

    let mut applied = 0;
    let mut failure = None;

    for operation in operations {
        let operation = operation?;

        debug!("running {:?}", operation);

        match transact(device, &operation.frame()) {
            Ok(reply) => {
                if let Operation::QueryChannel(channel) = operation {
                    println!("channel 0x{channel:02x}:\n{}", hex_lines(&reply));
                }

                if operation.commits() {
                    applied += 1;
                }
            },
            Err(err) => {
                failure = Some(err);
                break;
            },
        }
    }

    if applied > 0 {
        debug!("applying settings");
        transact(device, &apply_frame())?;
    }

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
