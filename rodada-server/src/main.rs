#[tokio::main]
async fn main() {
    if let Err(err) = rodada_server::start_server().await {
        eprintln!("rodada-server failed to start: {err}");
        std::process::exit(1);
    }
}
