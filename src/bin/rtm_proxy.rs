use clap::Parser;
use rtm_batch::proxy::{serve, ProxyState};
use rtm_batch::utils::logger;
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "rtm-proxy")]
#[command(about = "Login proxy: forwards to an upstream login service or serves mock tokens")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    /// Upstream login endpoint; mock responses are served when unset
    #[arg(long, env = "RTM_PROXY_UPSTREAM")]
    upstream: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init_server_logger(args.json_logs);

    if let Some(url) = &args.upstream {
        rtm_batch::utils::validation::validate_url("upstream", url)?;
    }

    serve(args.bind, ProxyState::new(args.upstream)).await?;
    Ok(())
}
