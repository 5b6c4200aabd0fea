use shadow_rs::ShadowBuilder;

fn main() {
    // Feeds `--version` and the default `application.version`.
    if let Err(e) = ShadowBuilder::builder().build() {
        panic!("failed to generate build metadata: {e}");
    }
}
