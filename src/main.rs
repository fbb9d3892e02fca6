fn main() -> anyhow::Result<()> {
    jsonrest::cli::run_cli()
}
