use wheelfetch_lib::cli::{parse_args, resolve_command, run_download};
use wheelfetch_lib::error::WheelFetchError;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), WheelFetchError> {
    color_eyre::install()?;

    let args = parse_args();
    let params = resolve_command(args.command)?;

    run_download(params).await?;

    Ok(())
}
