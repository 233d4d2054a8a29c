use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use crate::Context;
use crate::config::{Config, SalesforceAuth};
use crate::ui;

/// Validate the config file without any network calls
pub fn run(ctx: &Context, config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let book = config.goal_book()?;

    if !ctx.quiet {
        ui::header("Checking Configuration");
        ui::kv("File", &config_path.display().to_string());
        ui::kv("Goals", &book.len().to_string());
        ui::kv("Top-level", &book.roots().join(", "));
    }

    if config.app.cron_string.is_some() {
        let schedule = config.schedule()?;
        if !ctx.quiet {
            let next = schedule
                .next_after(Utc::now())
                .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
            ui::kv("Schedule", &format!("{schedule} (next: {next})"));
        }
    }

    let auth = config.salesforce_auth()?;
    let reports = match &auth {
        None => "not used".to_string(),
        Some(SalesforceAuth::Jwt { username, .. }) => format!("JWT bearer as {username}"),
        Some(SalesforceAuth::Token { instance_url, .. }) => format!("static token for {instance_url}"),
    };

    if !ctx.quiet {
        ui::kv("Reports", &reports);
        if let Some(warning) = auth.as_ref().and_then(missing_key_warning) {
            ui::warn(&warning);
        }
        println!();
        for goal in book.iter() {
            ui::dim(&format!("{} -> {} ({})", goal.id, goal.remote_id, goal.source.kind()));
        }
    }

    let dangling = book.dangling_references();
    if !dangling.is_empty() {
        println!();
        for (referrer, missing) in &dangling {
            ui::error(&format!("{referrer} references unknown goal '{missing}'"));
        }
        anyhow::bail!("{} unknown goal reference(s)", dangling.len());
    }

    if !ctx.quiet {
        println!();
        ui::success("Configuration is valid");
    }
    Ok(())
}

/// Warning for a JWT key file that is not on disk
fn missing_key_warning(auth: &SalesforceAuth) -> Option<String> {
    match auth {
        SalesforceAuth::Jwt { private_key_file, .. } if !private_key_file.exists() => {
            Some(format!("Private key {} does not exist", private_key_file.display()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ctx() -> Context {
        Context { verbose: 0, quiet: true }
    }

    #[test]
    fn test_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[app]
cron_string = "@hourly"
goals = ["a"]
[asana]
access_token = "t"
[goals.a]
goal_id = "1"
source = "fixed"
value = 3
"#,
        )
        .unwrap();

        run(&ctx(), &path).unwrap();
    }

    #[test]
    fn test_unknown_reference_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[app]
goals = ["a", "ghost"]
[asana]
access_token = "t"
[goals.a]
goal_id = "1"
source = "composite"
subgoals = ["missing"]
weights = [1.0]
"#,
        )
        .unwrap();

        let err = run(&ctx(), &path).unwrap_err();
        assert_eq!(err.to_string(), "2 unknown goal reference(s)");
    }

    #[test]
    fn test_invalid_cron_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[app]\ncron_string = \"not a cron\"\ngoals = []\n[asana]\naccess_token = \"t\"\n",
        )
        .unwrap();

        assert!(run(&ctx(), &path).is_err());
    }

    #[test]
    fn test_missing_key_warning() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("server.key");
        fs::write(&present, "key").unwrap();
        let jwt = |path: &Path| SalesforceAuth::Jwt {
            username: "u".into(),
            client_id: "c".into(),
            private_key_file: path.to_path_buf(),
        };

        let absent = dir.path().join("absent.key");
        assert_eq!(
            missing_key_warning(&jwt(&absent)),
            Some(format!("Private key {} does not exist", absent.display()))
        );
        assert_eq!(missing_key_warning(&jwt(&present)), None);
        assert_eq!(
            missing_key_warning(&SalesforceAuth::Token {
                access_token: "t".into(),
                instance_url: "https://i".into(),
            }),
            None
        );
    }

    #[test]
    fn test_missing_key_is_not_fatal_when_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            format!(
                "[app]\ngoals = [\"r\"]\n[asana]\naccess_token = \"t\"\n\
                 [salesforce]\nusername = \"u\"\nclient_id = \"c\"\nprivate_key_file = \"{}\"\n\
                 [goals.r]\ngoal_id = \"1\"\nsource = \"report\"\nreport_id = \"x\"\nmetric = \"m\"\n",
                dir.path().join("absent.key").display()
            ),
        )
        .unwrap();

        run(&ctx(), &path).unwrap();
    }
}
