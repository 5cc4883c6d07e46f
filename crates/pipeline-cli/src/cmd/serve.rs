use std::path::Path;

pub fn run(root: &Path, port: u16) -> anyhow::Result<()> {
    // Fail fast with a CLI-style error before starting the runtime.
    super::open(root)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(pipeline_server::serve(root.to_path_buf(), port))
}
