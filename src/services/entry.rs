//! Entry resolution for generated artifacts.
//!
//! Generated code is untrusted and frequently broken, so everything here
//! stays static: locating the runnable file follows a fixed rule set, and
//! picking the served symbol is a best-effort scan of the source text,
//! never execution.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::errors::{DomainError, DomainResult};

/// A resolved process-host entry: file, importable module name, symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub file: PathBuf,
    pub module: String,
    pub symbol: String,
}

/// Locate the runnable file for an artifact location.
///
/// A file must be a `.py` source. For a directory the resolution order is:
/// a file named after the directory, then `main.py`, then the largest
/// `.py` in the directory excluding `__init__.py` and `*_original.py`
/// backup copies.
pub fn resolve_entry_file(location: &Path) -> DomainResult<PathBuf> {
    if location.is_file() {
        if location.extension().and_then(|e| e.to_str()) != Some("py") {
            return Err(DomainError::EntryNotFound(format!(
                "entry file is not runnable python: {}",
                location.display()
            )));
        }
        return Ok(location.to_path_buf());
    }

    if location.is_dir() {
        if let Some(dir_name) = location.file_name().and_then(|n| n.to_str()) {
            let same_name = location.join(format!("{dir_name}.py"));
            if same_name.exists() {
                return Ok(same_name);
            }
        }

        let main = location.join("main.py");
        if main.exists() {
            return Ok(main);
        }

        let mut candidates: Vec<(u64, PathBuf)> = fs::read_dir(location)
            .map_err(|e| DomainError::EntryNotFound(format!(
                "cannot read directory {}: {e}",
                location.display()
            )))?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| {
                let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                p.extension().and_then(|e| e.to_str()) == Some("py")
                    && name != "__init__.py"
                    && !name.ends_with("_original.py")
            })
            .map(|p| {
                let size = fs::metadata(&p).map(|m| m.len()).unwrap_or(0);
                (size, p)
            })
            .collect();

        if candidates.is_empty() {
            return Err(DomainError::EntryNotFound(format!(
                "no runnable .py under directory: {}",
                location.display()
            )));
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        return Ok(candidates.remove(0).1);
    }

    Err(DomainError::EntryNotFound(format!(
        "artifact location does not exist: {}",
        location.display()
    )))
}

/// Decide which top-level symbol the process host should serve.
///
/// Pure pattern matching over the source text. Preference order mirrors
/// what generated services actually export: a web-application object
/// (`app = FastAPI(...)` / `app = Starlette(...)`), then an ASGI wrapper
/// produced from a protocol server (`mcp.streamable_http_app()` /
/// `mcp.sse_app()`), then a bare protocol-server object
/// (`mcp = FastMCP(...)`). Falls back to `default_symbol` when nothing
/// matches.
pub fn detect_entry_symbol(source: &str, default_symbol: &str) -> String {
    if assigns_call(source, "app", "FastAPI") || assigns_call(source, "app", "Starlette") {
        return "app".to_string();
    }

    for method in ["mcp.streamable_http_app", "mcp.sse_app"] {
        let app_wrapped = assigns_call(source, "app", method);
        let mcp_app_wrapped = assigns_call(source, "mcp_app", method);
        if app_wrapped || mcp_app_wrapped {
            return if has_assignment(source, "app") {
                "app".to_string()
            } else {
                "mcp_app".to_string()
            };
        }
    }

    if assigns_call(source, "mcp", "FastMCP") {
        return "mcp".to_string();
    }

    default_symbol.to_string()
}

/// Build the full entry point for an artifact location.
pub fn resolve_entry_point(location: &Path, default_symbol: &str) -> DomainResult<EntryPoint> {
    let file = resolve_entry_file(location)?;
    let module = file
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| DomainError::EntryNotFound(format!(
            "entry file has no usable stem: {}",
            file.display()
        )))?
        .to_string();

    let source = fs::read_to_string(&file).unwrap_or_default();
    let symbol = detect_entry_symbol(&source, default_symbol);

    Ok(EntryPoint { file, module, symbol })
}

/// True when some line assigns `name = callee(...)` at top level.
fn assigns_call(source: &str, name: &str, callee: &str) -> bool {
    source.lines().any(|line| {
        let rest = match strip_assignment(line, name) {
            Some(rest) => rest,
            None => return false,
        };
        rest.strip_prefix(callee)
            .map(|after| after.trim_start().starts_with('('))
            .unwrap_or(false)
    })
}

/// True when some line assigns anything to `name` at top level.
fn has_assignment(source: &str, name: &str) -> bool {
    source.lines().any(|line| strip_assignment(line, name).is_some())
}

/// If `line` is `name = <rest>`, return `<rest>` trimmed.
fn strip_assignment<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let trimmed = line.trim_start();
    let after_name = trimmed.strip_prefix(name)?;
    let after_eq = after_name.trim_start().strip_prefix('=')?;
    // Reject `==` comparisons and augmented assignments that slipped through
    if after_eq.starts_with('=') {
        return None;
    }
    Some(after_eq.trim_start())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_resolve_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "service.py", "app = FastAPI()\n");
        assert_eq!(resolve_entry_file(&file).unwrap(), file);
    }

    #[test]
    fn test_resolve_rejects_non_python_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(dir.path(), "service.txt", "not code");
        assert!(matches!(
            resolve_entry_file(&file),
            Err(DomainError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_directory_name() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("orders");
        fs::create_dir(&dir).unwrap();
        write_file(&dir, "main.py", "x = 1\n");
        let named = write_file(&dir, "orders.py", "app = FastAPI()\n");

        assert_eq!(resolve_entry_file(&dir).unwrap(), named);
    }

    #[test]
    fn test_resolve_falls_back_to_main() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("orders");
        fs::create_dir(&dir).unwrap();
        let main = write_file(&dir, "main.py", "x = 1\n");
        write_file(&dir, "util.py", "y = 2\n");

        assert_eq!(resolve_entry_file(&dir).unwrap(), main);
    }

    #[test]
    fn test_resolve_picks_largest_excluding_backups() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("svc");
        fs::create_dir(&dir).unwrap();
        write_file(&dir, "__init__.py", "");
        write_file(&dir, "small.py", "x = 1\n");
        let large = write_file(&dir, "large.py", &"# filler\n".repeat(50));
        write_file(&dir, "large_original.py", &"# filler\n".repeat(100));

        assert_eq!(resolve_entry_file(&dir).unwrap(), large);
    }

    #[test]
    fn test_resolve_empty_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("empty");
        fs::create_dir(&dir).unwrap();
        write_file(&dir, "__init__.py", "");

        assert!(matches!(
            resolve_entry_file(&dir),
            Err(DomainError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_missing_path_fails() {
        assert!(matches!(
            resolve_entry_file(Path::new("/nonexistent/artifact")),
            Err(DomainError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_detect_fastapi_app() {
        let src = "from fastapi import FastAPI\napp = FastAPI(title=\"svc\")\n";
        assert_eq!(detect_entry_symbol(src, "app"), "app");
    }

    #[test]
    fn test_detect_starlette_app() {
        let src = "app = Starlette(routes=routes)\n";
        assert_eq!(detect_entry_symbol(src, "app"), "app");
    }

    #[test]
    fn test_detect_streamable_http_wrapper() {
        let src = "mcp = FastMCP(\"svc\")\nmcp_app = mcp.streamable_http_app()\n";
        assert_eq!(detect_entry_symbol(src, "app"), "mcp_app");

        let src_with_app = "mcp = FastMCP(\"svc\")\napp = mcp.streamable_http_app()\n";
        assert_eq!(detect_entry_symbol(src_with_app, "app"), "app");
    }

    #[test]
    fn test_detect_bare_protocol_server() {
        let src = "from mcp.server.fastmcp import FastMCP\nmcp = FastMCP(\"svc\")\n";
        assert_eq!(detect_entry_symbol(src, "app"), "mcp");
    }

    #[test]
    fn test_detect_falls_back_to_default() {
        let src = "def handler():\n    pass\n";
        assert_eq!(detect_entry_symbol(src, "app"), "app");
        assert_eq!(detect_entry_symbol(src, "application"), "application");
    }

    #[test]
    fn test_comparison_is_not_assignment() {
        let src = "if app == FastAPI():\n    pass\n";
        assert_eq!(detect_entry_symbol(src, "fallback"), "fallback");
    }
}
