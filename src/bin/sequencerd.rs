//! Sequencer server binary.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    streamlog_sequencer::server::run().await
}
