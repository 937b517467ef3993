use std::sync::Arc;

use extframe_protocol::{Server, ServerConfig, ShutdownHandle};
use extframe_store::MemoryStore;
use extframe_wire::WireConfig;
use tracing::info;

use crate::cmd::{parse_duration, ServeArgs};
use crate::exit::{protocol_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_listening, OutputFormat};

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = server_config(&args)?;
    let legacy_envelope = config.legacy_envelope;
    let store = Arc::new(MemoryStore::new());

    let server = Server::bind_with_config(args.addr.as_str(), config, Arc::clone(&store))
        .map_err(|err| protocol_error("bind failed", err))?;
    install_ctrlc_handler(server.shutdown_handle())?;

    print_listening(&server.local_addr().to_string(), legacy_envelope, format);
    server
        .serve()
        .map_err(|err| protocol_error("serve failed", err))?;

    let datasets = store.dataset_names().unwrap_or_default();
    info!(datasets = datasets.len(), "store discarded on exit");
    Ok(SUCCESS)
}

fn server_config(args: &ServeArgs) -> CliResult<ServerConfig> {
    let read_timeout = args.read_timeout.as_deref().map(parse_duration).transpose()?;
    let write_timeout = args.write_timeout.as_deref().map(parse_duration).transpose()?;
    Ok(ServerConfig {
        wire: WireConfig {
            read_timeout,
            write_timeout,
            ..WireConfig::default()
        },
        legacy_envelope: args.legacy_envelope,
        ..ServerConfig::default()
    })
}

fn install_ctrlc_handler(handle: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || handle.shutdown()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeouts_flow_into_wire_config() {
        let args = ServeArgs {
            addr: "127.0.0.1:0".into(),
            legacy_envelope: true,
            read_timeout: Some("250ms".into()),
            write_timeout: None,
        };
        let config = server_config(&args).unwrap();
        assert!(config.legacy_envelope);
        assert!(config.nodelay);
        assert_eq!(config.wire.read_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.wire.write_timeout, None);
    }

    #[test]
    fn bad_timeout_is_usage_error() {
        let args = ServeArgs {
            addr: "127.0.0.1:0".into(),
            legacy_envelope: false,
            read_timeout: Some("soon".into()),
            write_timeout: None,
        };
        assert_eq!(
            server_config(&args).unwrap_err().code,
            crate::exit::USAGE
        );
    }
}
