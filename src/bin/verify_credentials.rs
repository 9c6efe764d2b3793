//! Credential check binary.

use caze_bot::commands::verify;
use caze_bot::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    let user = verify::run(&Config::new()).await?;
    println!("@{} ({})", user.screen_name, user.id_str);
    Ok(())
}
