#[tokio::main]
async fn main() -> tokio::io::Result<()> {
    unsafe { std::env::set_var("RUST_LOG", "note_courier=debug") };
    env_logger::init();
    note_courier::app::main().await.unwrap();
    Ok(())
}
