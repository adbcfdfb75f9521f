fn main() -> anyhow::Result<()> {
    radiance::run()
}
