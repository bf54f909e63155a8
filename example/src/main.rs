use tracing::{Instrument, trace_span};
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use rowstitch::Result;

mod remote;
mod rows;
mod channel;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::Registry::default()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    rows::main().instrument(trace_span!("rows")).await?;
    channel::main().instrument(trace_span!("channel")).await?;

    Ok(())
}
