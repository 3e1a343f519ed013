//! terraform-provider-po - serves the `po` provider over the plugin protocol

use anyhow::Context;

use po_common::telemetry::init_logging;
use po_provider::{PoProvider, PROVIDER_NAME};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting provider");

    tf_provider::serve(PROVIDER_NAME, PoProvider::default()).await
}
