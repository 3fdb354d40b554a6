fn main() -> anyhow::Result<()> {
    helipad_scene::run()
}
