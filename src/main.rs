fn main() -> anyhow::Result<()> {
    fmcast::runtime::run()
}
