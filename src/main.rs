fn main() -> anyhow::Result<()> {
    webshelf::cli::run()
}
