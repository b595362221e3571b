//! Standard chains and the core module that wires them together.
//!
//! ```text
//! INIT → PRE_PROCESS → PROCESS → DETERMINE_HANDLER → INVOKE_HANDLER → POST_INVOKE → POST_PROCESS
//!                                                          │
//!                                                          └─ exception → EXCEPTION_OCCURRED → POST_PROCESS
//! ```
//!
//! Each arrow is a chain's default action, so a request that no module touches
//! still walks the whole sequence. Feature modules append steps to these
//! chains and add route-ifs that divert from them.
//!
//! A handler error that no exception mapper answered leaves `POST_PROCESS`
//! with a 500 and the error message as body.

use crate::keys::{EXCEPTION, HANDLER, RESPONSE_BODY, RESPONSE_STATUS};
use crate::{ExceptionMapper, StatusMapper};
use chainer::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

pub const INIT: ChainName = ChainName::from_static("INIT");
pub const PRE_PROCESS: ChainName = ChainName::from_static("PRE_PROCESS");
pub const PROCESS: ChainName = ChainName::from_static("PROCESS");
pub const DETERMINE_HANDLER: ChainName = ChainName::from_static("DETERMINE_HANDLER");
pub const INVOKE_HANDLER: ChainName = ChainName::from_static("INVOKE_HANDLER");
pub const POST_INVOKE: ChainName = ChainName::from_static("POST_INVOKE");
pub const EXCEPTION_OCCURRED: ChainName = ChainName::from_static("EXCEPTION_OCCURRED");
pub const POST_PROCESS: ChainName = ChainName::from_static("POST_PROCESS");

/// Creates the standard chains. Must be the first module registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreModule;

impl ChainModule for CoreModule {
    fn name(&self) -> &str {
        "http.core"
    }

    fn register(&self, ext: &mut ChainExtender<'_>) -> Result<(), ConfigError> {
        let sequence = [
            (INIT, Some(PRE_PROCESS)),
            (PRE_PROCESS, Some(PROCESS)),
            (PROCESS, Some(DETERMINE_HANDLER)),
            (DETERMINE_HANDLER, Some(INVOKE_HANDLER)),
            (INVOKE_HANDLER, Some(POST_INVOKE)),
            (POST_INVOKE, Some(POST_PROCESS)),
            (EXCEPTION_OCCURRED, Some(POST_PROCESS)),
            (POST_PROCESS, None),
        ];
        for (chain, next) in sequence {
            ext.create_chain(chain, next.map(Action::Jump))?;
        }

        ext.append_processor(INVOKE_HANDLER, InvokeHandler)?
            .append_rule(
                INVOKE_HANDLER,
                Rule::jump_if(Condition::present(&EXCEPTION), EXCEPTION_OCCURRED),
            )?
            .append_processor(POST_PROCESS, DefaultStatus)?;
        Ok(())
    }
}

/// Runs the handler under [`HANDLER`]; a handler failure lands in [`EXCEPTION`]
/// and discards whatever status and body the handler had written.
#[derive(Debug)]
pub struct InvokeHandler;

impl Processor for InvokeHandler {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        let handler = Arc::clone(md.get(&HANDLER)?);
        if let Err(err) = handler.handle(md) {
            warn!(error = %err, "handler failed");
            md.remove(&RESPONSE_STATUS);
            md.remove(&RESPONSE_BODY);
            md.set(&EXCEPTION, err);
        }
        Ok(())
    }

    fn name(&self) -> String {
        "invoke handler".to_owned()
    }
}

/// Chooses a status when nothing else did: 500 for an unmapped exception,
/// otherwise 200.
#[derive(Debug)]
pub struct DefaultStatus;

impl Processor for DefaultStatus {
    fn apply(&self, md: &mut MetaData) -> Result<(), PipelineError> {
        if md.contains(&RESPONSE_STATUS) {
            return Ok(());
        }
        match md.get_optional(&EXCEPTION).cloned() {
            Some(err) => {
                debug!(error = %err, "unmapped exception, answering 500");
                StatusMapper::new(500).map(&err, md);
            }
            None => {
                debug!("no status set, answering 200");
                md.set(&RESPONSE_STATUS, 200);
            }
        }
        Ok(())
    }

    fn name(&self) -> String {
        "default status".to_owned()
    }
}
