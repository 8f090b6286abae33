// Native builds only, hosts drive the library exports.
fn main() {
    env_logger::init();
    log::debug!("yuvsink {} has no native front-end", env!("CARGO_PKG_VERSION"));
}
