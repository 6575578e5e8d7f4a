#[tokio::main]
async fn main() {
    carnet::run().await;
}
