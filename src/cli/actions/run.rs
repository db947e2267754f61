use super::{Action, server};
use crate::cli::telemetry;
use anyhow::Result;

pub(super) async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Server(args) => server::execute(args).await,
    };

    telemetry::shutdown_tracer();

    result
}
