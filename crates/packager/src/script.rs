//! Remote restart script generation.
//!
//! The script runs on the server from the deploy directory under
//! `set -e`, so any failing step aborts it and the non-zero status
//! travels back through ssh.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PackageError;

/// File name of the generated script inside the package.
pub const SCRIPT_NAME: &str = "server-deploy.sh";

/// Values interpolated into `server-deploy.sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartScript {
    /// Human-readable name used in progress messages.
    pub app_name: String,
    /// Port checked over HTTP after the restart.
    pub port: u16,
    /// `pkill`/`pgrep -f` pattern identifying the app process.
    pub process_pattern: String,
    /// `screen` session name the app runs in.
    pub session_name: String,
    /// Entry point passed to `node`.
    pub entry_point: String,
    /// Log file tailed when the app fails to start.
    pub log_file: String,
}

impl Default for RestartScript {
    fn default() -> Self {
        Self {
            app_name: "Stack Blog MVP".into(),
            port: 3000,
            process_pattern: "node.*app.js".into(),
            session_name: "stackblog".into(),
            entry_point: "app.js".into(),
            log_file: "logs/app.log".into(),
        }
    }
}

impl RestartScript {
    /// Rejects values that would break out of their double-quoted slot.
    pub fn validate(&self) -> Result<(), PackageError> {
        let fields = [
            ("app_name", &self.app_name),
            ("process_pattern", &self.process_pattern),
            ("session_name", &self.session_name),
            ("entry_point", &self.entry_point),
            ("log_file", &self.log_file),
        ];
        for (field, value) in fields {
            let unsafe_char = value
                .chars()
                .any(|c| matches!(c, '"' | '`' | '$' | '\\' | '\n' | '\r'));
            if value.trim().is_empty() || unsafe_char {
                return Err(PackageError::ScriptValue {
                    field,
                    value: value.clone(),
                });
            }
        }
        if self.port == 0 {
            return Err(PackageError::ScriptValue {
                field: "port",
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Renders the script text.
    pub fn render(&self) -> String {
        let Self {
            app_name,
            port,
            process_pattern,
            session_name,
            entry_point,
            log_file,
        } = self;

        format!(
            r#"#!/bin/bash
set -e

echo "Setting up directory structure..."
mkdir -p logs content/pages content/media

echo "Installing production dependencies..."
npm ci --production

echo "Setting file permissions..."
chmod -R 755 .
chmod -R 766 content/ logs/

echo "Stopping existing application..."
pkill -f "{process_pattern}" || true
sleep 3

echo "Starting {app_name}..."
screen -dmS "{session_name}" node "{entry_point}"
sleep 5

echo "Checking application status..."
if pgrep -f "{process_pattern}" > /dev/null; then
    echo "{app_name} is running"
    pgrep -f "{process_pattern}" | xargs ps -p
else
    echo "Application failed to start"
    tail -20 "{log_file}" 2>/dev/null || echo "No log file found"
    exit 1
fi

echo "Testing connectivity..."
if curl -s -o /dev/null -w "%{{http_code}}" "http://localhost:{port}/" | grep -q "200\|404"; then
    echo "Application responding on port {port}"
else
    echo "Application not responding properly"
fi

echo "{app_name} deployment completed"
"#
        )
    }

    /// Writes the script into `dir` with mode 0755 and returns its path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, PackageError> {
        let path = dir.join(SCRIPT_NAME);
        let mut file = std::fs::File::create(&path)?;
        file.write_all(self.render().as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        }

        tracing::debug!(path = %path.display(), "restart script written");
        Ok(path)
    }
}
