#[tokio::main]
async fn main() {
    library::start_server().await;
}
