use extframe_protocol::connect_with_config;

use crate::cmd::upload::client_config;
use crate::cmd::{parse_duration, DownloadArgs};
use crate::exit::{protocol_error, CliResult, SUCCESS};
use crate::output::{print_partition, OutputFormat};

pub fn run(args: DownloadArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let client = connect_with_config(
        args.addr.as_str(),
        client_config(timeout, args.legacy_envelope),
    )
    .map_err(|err| protocol_error("connect failed", err))?;

    let data = client
        .download(&args.dataset, args.partition, &args.columns)
        .map_err(|err| protocol_error("download failed", err))?;

    print_partition(&args.dataset, args.partition, &args.columns, &data, format);
    Ok(SUCCESS)
}
