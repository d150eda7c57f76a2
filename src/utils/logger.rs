use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 函式庫與兩個執行檔 (`gfs-pipeline`, `toml-pipeline`) 的預設過濾
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "gfs_pipeline=debug,toml_pipeline=debug,info"
    } else {
        "gfs_pipeline=info,toml_pipeline=info"
    }
}

pub fn init_cli_logger(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// 給排程器 (cron / systemd timer) 使用的 JSON 日誌格式
pub fn init_json_logger() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(false)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_both_binaries() {
        for verbose in [false, true] {
            let directives = default_directives(verbose);
            assert!(directives.contains("gfs_pipeline="));
            assert!(directives.contains("toml_pipeline="));
            assert!(EnvFilter::try_new(directives).is_ok());
        }
        assert!(default_directives(true).contains("toml_pipeline=debug"));
    }
}
