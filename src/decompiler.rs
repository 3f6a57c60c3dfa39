//! Vineflower download and subprocess management
//!
//! The decompiler jar is fetched into the cache directory once and reused from
//! then on. Each run spawns `java -jar vineflower.jar` with one background thread
//! forwarding the child's stdout to a [`LineSink`]. Once the child exits, that
//! thread is given [`DRAIN_TIMEOUT`] to finish before the run returns without it.

use crate::platform::PlatformQuery;
use crate::{Error, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const VINEFLOWER_URL: &str =
    "https://github.com/Vineflower/vineflower/releases/download/1.11.2/vineflower-1.11.2-slim.jar";

pub const TOOL_FILE_NAME: &str = "vineflower.jar";

/// Package prefix passed to `--only=`
pub const DEFAULT_ONLY: &str = "com/hypixel";

/// How long to wait for buffered output after the child has exited
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Receives decompiler output one line at a time
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Sink forwarding every line to the `log` facade under the `vineflower` target
pub fn log_sink() -> LineSink {
    Arc::new(|line: &str| log::info!(target: "vineflower", "{}", line))
}

/// Downloads a URL to a file
pub trait ToolFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTP fetcher
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("hytale-sources/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(600))
            .build()?;
        Ok(Self { client })
    }
}

impl ToolFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let tool_fetch = |reason: String| Error::ToolFetch {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| tool_fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(tool_fetch(format!("HTTP {}", status.as_u16())));
        }

        let mut file = File::create(dest)
            .map_err(|e| tool_fetch(format!("cannot write {}: {}", dest.display(), e)))?;
        response
            .copy_to(&mut file)
            .map_err(|e| tool_fetch(e.to_string()))?;

        Ok(())
    }
}

/// A decompiler jar identified by its download URL and on-disk name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompilerTool {
    pub url: String,
    pub file_name: String,
}

impl Default for DecompilerTool {
    fn default() -> Self {
        Self::with_url(VINEFLOWER_URL)
    }
}

impl DecompilerTool {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: TOOL_FILE_NAME.to_string(),
        }
    }

    pub fn path_in(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(&self.file_name)
    }

    /// Download the tool into `cache_dir` unless it is already there.
    ///
    /// An existing file is never revalidated against the remote.
    pub fn ensure(&self, cache_dir: &Path, fetcher: &dyn ToolFetcher) -> Result<PathBuf> {
        let target = self.path_in(cache_dir);
        if target.exists() {
            log::debug!("Using cached decompiler at {}", target.display());
            return Ok(target);
        }

        fs::create_dir_all(cache_dir).map_err(|e| Error::ToolFetch {
            url: self.url.clone(),
            reason: format!("cannot create {}: {}", cache_dir.display(), e),
        })?;

        log::info!("Downloading decompiler from {}", self.url);

        let partial = cache_dir.join(format!("{}.part", self.file_name));
        if let Err(e) = fetcher.fetch(&self.url, &partial) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        fs::rename(&partial, &target).map_err(|e| Error::ToolFetch {
            url: self.url.clone(),
            reason: format!("cannot move download into {}: {}", target.display(), e),
        })?;

        Ok(target)
    }
}

/// Ensure the default Vineflower jar is in `cache_dir`
pub fn ensure_tool(cache_dir: &Path) -> Result<PathBuf> {
    DecompilerTool::default().ensure(cache_dir, &HttpFetcher::new()?)
}

/// Pick the Java executable: explicit path, then `JAVA_HOME`, then `PATH`
pub fn find_java(configured: Option<&Path>, query: &dyn PlatformQuery) -> Result<PathBuf> {
    if let Some(path) = configured {
        // Absolute, so a relative setting is not mistaken for a PATH lookup later
        return if path.exists() {
            Ok(std::path::absolute(path)?)
        } else {
            Err(Error::JavaNotFound)
        };
    }

    let exe = format!("java{}", std::env::consts::EXE_SUFFIX);

    if let Some(home) = query.env_var("JAVA_HOME") {
        let candidate = PathBuf::from(home).join("bin").join(&exe);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    which::which("java").map_err(|_| Error::JavaNotFound)
}

/// A runnable decompiler command line
#[derive(Debug, Clone)]
pub struct Decompiler {
    program: PathBuf,
    leading_args: Vec<OsString>,
    only: String,
    drain_timeout: Duration,
}

impl Decompiler {
    /// `java -jar <tool>`.
    ///
    /// Both paths are made absolute, since the child runs inside the cache
    /// directory rather than the caller's working directory.
    pub fn java(java: impl Into<PathBuf>, tool: &Path) -> Result<Self> {
        let java = java.into();
        let program = if java.components().count() > 1 {
            std::path::absolute(&java)?
        } else {
            // Bare command name, resolved through PATH
            java
        };
        let tool = std::path::absolute(tool)?;

        Ok(Self::with_program(
            program,
            vec![OsString::from("-jar"), tool.into_os_string()],
        ))
    }

    pub fn with_program(program: impl Into<PathBuf>, leading_args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            leading_args,
            only: DEFAULT_ONLY.to_string(),
            drain_timeout: DRAIN_TIMEOUT,
        }
    }

    pub fn only(mut self, namespace: impl Into<String>) -> Self {
        self.only = namespace.into();
        self
    }

    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.leading_args
    }

    fn command(&self, working_dir: &Path, input_name: &str, output_name: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg(format!("--only={}", self.only))
            .arg(input_name)
            .arg(output_name)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }

    /// Decompile `working_dir/input_name` into `working_dir/output_name`.
    ///
    /// Fails if the child exits non-zero or leaves no output file behind. On
    /// failure nothing is left at the output path, so a half-written sources
    /// jar is never mistaken for a finished one.
    pub fn decompile(
        &self,
        working_dir: &Path,
        input_name: &str,
        output_name: &str,
        sink: &LineSink,
    ) -> Result<PathBuf> {
        let output = working_dir.join(output_name);
        discard_output(&output);

        let result = self.run_child(working_dir, input_name, output_name, sink);
        match result {
            Ok(()) if output.exists() => Ok(output),
            Ok(()) => Err(Error::DecompileFailure {
                reason: format!("expected output {} was not produced", output.display()),
            }),
            Err(e) => {
                discard_output(&output);
                Err(e)
            }
        }
    }

    fn run_child(
        &self,
        working_dir: &Path,
        input_name: &str,
        output_name: &str,
        sink: &LineSink,
    ) -> Result<()> {
        log::info!(
            "Running {} on {} in {}",
            self.program.display(),
            input_name,
            working_dir.display()
        );

        let mut child = self
            .command(working_dir, input_name, output_name)
            .spawn()
            .map_err(|e| Error::DecompileFailure {
                reason: format!("could not launch {}: {}", self.program.display(), e),
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => return Err(abort_child(&mut child, "decompiler stdout was not captured")),
        };

        let (done_tx, done_rx) = mpsc::channel::<()>();
        let worker_sink = Arc::clone(sink);
        let spawned = thread::Builder::new()
            .name("decompiler-output".to_string())
            .spawn(move || {
                let reader = BufReader::new(stdout);
                for chunk in reader.split(b'\n') {
                    match chunk {
                        Ok(bytes) => {
                            let line = String::from_utf8_lossy(&bytes);
                            worker_sink(line.trim_end_matches('\r'));
                        }
                        Err(e) => {
                            log::debug!("Stopped reading decompiler output: {}", e);
                            break;
                        }
                    }
                }
                let _ = done_tx.send(());
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                return Err(abort_child(
                    &mut child,
                    &format!("could not start output reader: {}", e),
                ))
            }
        };

        let status = child.wait()?;

        match done_rx.recv_timeout(self.drain_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = worker.join();
            }
            Err(RecvTimeoutError::Timeout) => {
                // Dropping the handle detaches the thread
                log::warn!(
                    "Decompiler output still draining after {:?}, continuing without it",
                    self.drain_timeout
                );
            }
        }

        if !status.success() {
            return Err(Error::DecompileFailure {
                reason: format!("{} exited with {}", self.program.display(), status),
            });
        }

        Ok(())
    }
}

/// Kill and reap a child that can no longer be supervised
fn abort_child(child: &mut Child, reason: &str) -> Error {
    if let Err(e) = child.kill() {
        log::debug!("Could not kill decompiler: {}", e);
    }
    if let Err(e) = child.wait() {
        log::debug!("Could not reap decompiler: {}", e);
    }
    Error::DecompileFailure {
        reason: reason.to_string(),
    }
}

fn discard_output(output: &Path) {
    if output.is_file() {
        match fs::remove_file(output) {
            Ok(()) => log::debug!("Removed {}", output.display()),
            Err(e) => log::warn!("Could not remove {}: {}", output.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HostOs, SystemPlatform};
    use std::cell::Cell;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl ToolFetcher for CountingFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            fs::write(dest, b"fake jar")?;
            Ok(())
        }
    }

    struct FailingFetcher;

    impl ToolFetcher for FailingFetcher {
        fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
            fs::write(dest, b"trunc")?;
            Err(Error::ToolFetch {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            })
        }
    }

    struct JavaHome(Option<String>);

    impl PlatformQuery for JavaHome {
        fn host_os(&self) -> HostOs {
            HostOs::current()
        }
        fn home_dir(&self) -> Option<PathBuf> {
            None
        }
        fn env_var(&self, key: &str) -> Option<String> {
            if key == "JAVA_HOME" {
                self.0.clone()
            } else {
                None
            }
        }
        fn registry_string(&self, _key: &str, _value: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_ensure_downloads_once() {
        let temp = TempDir::new().unwrap();
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let tool = DecompilerTool::default();

        let first = tool.ensure(temp.path(), &fetcher).unwrap();
        let second = tool.ensure(temp.path(), &fetcher).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, temp.path().join(TOOL_FILE_NAME));
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_failed_fetch_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let tool = DecompilerTool::default();

        let err = tool.ensure(temp.path(), &FailingFetcher).unwrap_err();

        assert!(matches!(err, Error::ToolFetch { .. }));
        assert!(!tool.path_in(temp.path()).exists());
        assert!(!temp.path().join("vineflower.jar.part").exists());
    }

    #[test]
    fn test_http_fetch_is_idempotent() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/vineflower.jar")
            .with_status(200)
            .with_body("jar bytes")
            .expect(1)
            .create();

        let temp = TempDir::new().unwrap();
        let tool = DecompilerTool::with_url(format!("{}/vineflower.jar", server.url()));
        let fetcher = HttpFetcher::new().unwrap();

        let path = tool.ensure(temp.path(), &fetcher).unwrap();
        tool.ensure(temp.path(), &fetcher).unwrap();

        mock.assert();
        assert_eq!(fs::read(path).unwrap(), b"jar bytes");
    }

    #[test]
    fn test_http_fetch_status_error() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing.jar").with_status(404).create();

        let temp = TempDir::new().unwrap();
        let tool = DecompilerTool::with_url(format!("{}/missing.jar", server.url()));

        match tool.ensure(temp.path(), &HttpFetcher::new().unwrap()) {
            Err(Error::ToolFetch { url, reason }) => {
                assert!(url.ends_with("/missing.jar"));
                assert!(reason.contains("404"));
            }
            other => panic!("expected ToolFetch, got {:?}", other),
        }
        assert!(!tool.path_in(temp.path()).exists());
    }

    #[test]
    fn test_find_java_configured_path() {
        let temp = TempDir::new().unwrap();
        let java = temp.path().join("java");
        fs::write(&java, b"").unwrap();

        assert_eq!(find_java(Some(java.as_path()), &SystemPlatform).unwrap(), java);

        let missing = temp.path().join("nope");
        assert!(matches!(
            find_java(Some(missing.as_path()), &SystemPlatform),
            Err(Error::JavaNotFound)
        ));
    }

    #[test]
    fn test_find_java_from_java_home() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        let java = bin.join(format!("java{}", std::env::consts::EXE_SUFFIX));
        fs::write(&java, b"").unwrap();

        let query = JavaHome(Some(temp.path().display().to_string()));
        assert_eq!(find_java(None, &query).unwrap(), java);
    }

    #[test]
    fn test_java_command_uses_absolute_paths() {
        let decompiler =
            Decompiler::java(Path::new("jdk/bin/java"), Path::new("cache/vineflower.jar")).unwrap();
        let cwd = std::env::current_dir().unwrap();

        assert_eq!(decompiler.program(), cwd.join("jdk/bin/java"));
        assert_eq!(decompiler.args()[0], OsString::from("-jar"));
        assert_eq!(
            PathBuf::from(&decompiler.args()[1]),
            cwd.join("cache/vineflower.jar")
        );

        // A bare name is left for PATH lookup
        let bare = Decompiler::java("java", Path::new("/opt/vineflower.jar")).unwrap();
        assert_eq!(bare.program(), Path::new("java"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn fake_tool(dir: &Path, body: &str) -> Decompiler {
            let script = dir.join("fake-vineflower.sh");
            fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
            Decompiler::with_program("sh", vec![script.into_os_string()])
        }

        fn collecting_sink() -> (LineSink, Arc<Mutex<Vec<String>>>) {
            let lines = Arc::new(Mutex::new(Vec::new()));
            let captured = Arc::clone(&lines);
            let sink: LineSink = Arc::new(move |line: &str| {
                captured.lock().unwrap().push(line.to_string());
            });
            (sink, lines)
        }

        #[test]
        fn test_decompile_streams_output() {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("HytaleServer.jar"), b"v1").unwrap();
            let decompiler = fake_tool(
                temp.path(),
                "echo \"args $1\"\necho \"INFO: Decompiling $2\"\ncp \"$2\" \"$3\"",
            );
            let (sink, lines) = collecting_sink();

            let output = decompiler
                .decompile(
                    temp.path(),
                    "HytaleServer.jar",
                    "HytaleServer-sources.jar",
                    &sink,
                )
                .unwrap();

            assert_eq!(output, temp.path().join("HytaleServer-sources.jar"));
            assert_eq!(fs::read(&output).unwrap(), b"v1");
            let lines = lines.lock().unwrap();
            assert_eq!(
                *lines,
                vec![
                    "args --only=com/hypixel".to_string(),
                    "INFO: Decompiling HytaleServer.jar".to_string(),
                ]
            );
        }

        #[test]
        fn test_only_namespace_is_configurable() {
            let temp = TempDir::new().unwrap();
            let decompiler =
                fake_tool(temp.path(), "echo \"$1\"\ntouch \"$3\"").only("com/example");
            let (sink, lines) = collecting_sink();

            decompiler
                .decompile(temp.path(), "in.jar", "out.jar", &sink)
                .unwrap();

            assert_eq!(*lines.lock().unwrap(), vec!["--only=com/example".to_string()]);
        }

        #[test]
        fn test_non_zero_exit_is_failure() {
            let temp = TempDir::new().unwrap();
            let decompiler = fake_tool(temp.path(), "echo partial > \"$3\"\nexit 3");
            let (sink, _) = collecting_sink();

            let err = decompiler
                .decompile(temp.path(), "in.jar", "out.jar", &sink)
                .unwrap_err();

            match err {
                Error::DecompileFailure { reason } => assert!(reason.contains("exit")),
                other => panic!("expected DecompileFailure, got {:?}", other),
            }
            assert!(!temp.path().join("out.jar").exists());
        }

        #[test]
        fn test_stale_output_is_not_reported_as_new() {
            let temp = TempDir::new().unwrap();
            fs::write(temp.path().join("out.jar"), b"from an earlier run").unwrap();
            let decompiler = fake_tool(temp.path(), "echo done");
            let (sink, _) = collecting_sink();

            assert!(matches!(
                decompiler.decompile(temp.path(), "in.jar", "out.jar", &sink),
                Err(Error::DecompileFailure { .. })
            ));
            assert!(!temp.path().join("out.jar").exists());
        }

        #[test]
        fn test_abort_child_reaps_process() {
            let mut child = Command::new("sleep").arg("30").spawn().unwrap();

            let err = abort_child(&mut child, "could not start output reader");

            assert!(matches!(err, Error::DecompileFailure { .. }));
            assert!(child.try_wait().unwrap().is_some());
        }

        #[test]
        fn test_missing_output_is_failure() {
            let temp = TempDir::new().unwrap();
            let decompiler = fake_tool(temp.path(), "echo done");
            let (sink, _) = collecting_sink();

            let err = decompiler
                .decompile(temp.path(), "in.jar", "out.jar", &sink)
                .unwrap_err();

            match err {
                Error::DecompileFailure { reason } => assert!(reason.contains("out.jar")),
                other => panic!("expected DecompileFailure, got {:?}", other),
            }
        }

        #[test]
        fn test_drain_wait_is_bounded() {
            let temp = TempDir::new().unwrap();
            // The background sleep inherits stdout and keeps the pipe open
            let decompiler = fake_tool(temp.path(), "touch \"$3\"\nsleep 5 &\necho started")
                .drain_timeout(Duration::from_millis(100));
            let (sink, _) = collecting_sink();

            let started = std::time::Instant::now();
            decompiler
                .decompile(temp.path(), "in.jar", "out.jar", &sink)
                .unwrap();

            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_launch_failure() {
            let temp = TempDir::new().unwrap();
            let decompiler = Decompiler::with_program(temp.path().join("no-such-binary"), vec![]);
            let (sink, _) = collecting_sink();

            assert!(matches!(
                decompiler.decompile(temp.path(), "in.jar", "out.jar", &sink),
                Err(Error::DecompileFailure { .. })
            ));
        }
    }
}
