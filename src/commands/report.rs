use crate::args::{ReportArgs, ReportFormat};
use crate::commands::Out;
use crate::query;
use crate::report::Report;
use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::{Local, Utc};
use std::path::PathBuf;

/// Subdirectory of the floos home where reports are written by default.
const REPORTS: &str = "reports";

/// Writes a report over the transactions in a window.
///
/// Without `--output` the report is written to `$FLOOS_HOME/reports` and named after the dates it
/// covers, e.g. `Floos_Jan5_Feb12.txt`.
///
/// Returns the path of the written file.
pub async fn report(config: Config, args: ReportArgs) -> Result<Out<PathBuf>> {
    let all = config
        .db()
        .get_all()
        .await
        .context("Unable to read transactions for the report")?;
    let transactions = query::filter_by_window_local(&all, args.window, config.week_start());
    let report = Report::new(transactions, Utc::now());

    let contents = match args.format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(&report).context("Failed to serialize the report")?
        }
        ReportFormat::Text => report.render_text(&Local, config.currency()),
    };

    let path = match args.output {
        Some(path) => path,
        None => {
            let dir = config.root().join(REPORTS);
            utils::make_dir(&dir).await?;
            dir.join(format!(
                "{}.{}",
                report.file_stem(&Local),
                args.format.extension()
            ))
        }
    };
    utils::write(&path, contents).await?;

    let message = format!(
        "Wrote a report of {} transaction{} to {}",
        report.transactions().len(),
        if report.transactions().len() == 1 { "" } else { "s" },
        path.display()
    );
    Ok(Out::new(message, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Window;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_report_text_default_path() {
        let env = TestEnv::new().await;
        env.insert_test_data().await;

        let args = ReportArgs {
            window: Window::All,
            format: ReportFormat::Text,
            output: None,
        };
        let out = report(env.config(), args).await.unwrap();
        let path = out.structure().unwrap();
        assert!(path.starts_with(env.config().root().join("reports")));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Floos_"));
        assert!(name.ends_with(".txt"));

        let text = utils::read(path).await.unwrap();
        assert!(text.contains("Balance:        OMR 6.000"));
    }

    #[tokio::test]
    async fn test_report_empty_json() {
        let env = TestEnv::new().await;
        let args = ReportArgs {
            window: Window::Today,
            format: ReportFormat::Json,
            output: None,
        };
        let out = report(env.config(), args).await.unwrap();
        let path = out.structure().unwrap();
        assert!(path.ends_with("Floos_Report.json"));

        let json: serde_json::Value = utils::deserialize(path).await.unwrap();
        assert!(json["period"].is_null());
        assert_eq!(json["summary"]["balance"], "0");
    }
}
