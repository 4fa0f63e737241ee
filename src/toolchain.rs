//! Invocation of the external C toolchain. The compiler blocks on the
//! child process; a non-zero exit surfaces the child's stderr verbatim
//! and the intermediate `.c` file is left in place for debugging.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context};

pub struct Toolchain {
    cc: String,
    include_dirs: Vec<String>,
    /// Objects of the host runtime linked into program builds.
    runtime_objects: Vec<String>,
}

impl Toolchain {
    /// Configuration from the environment: `TITAN_CC` (default `cc`),
    /// `TITAN_LUA_DIR` for the host headers (default `lua/src`), and
    /// `TITAN_RUNTIME_OBJS` as a space-separated object list for program
    /// links (default `lua/src/liblua.a`).
    pub fn from_env() -> Self {
        let lua_dir = std::env::var("TITAN_LUA_DIR").unwrap_or_else(|_| "lua/src".to_string());
        let runtime = std::env::var("TITAN_RUNTIME_OBJS")
            .unwrap_or_else(|_| format!("{}/liblua.a", lua_dir));
        Self {
            cc: std::env::var("TITAN_CC").unwrap_or_else(|_| "cc".to_string()),
            include_dirs: vec![lua_dir],
            runtime_objects: runtime.split_whitespace().map(str::to_string).collect(),
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "--std=c99".to_string(),
            "-O2".to_string(),
            "-Wall".to_string(),
            "-fPIC".to_string(),
        ];
        for dir in &self.include_dirs {
            args.push("-I".to_string());
            args.push(dir.clone());
        }
        args
    }

    fn shared_flag() -> &'static str {
        if cfg!(target_os = "macos") {
            "-bundle"
        } else {
            "-shared"
        }
    }

    pub fn compile_shared(&self, c_path: &Path, so_path: &Path) -> anyhow::Result<()> {
        let mut args = self.base_args();
        args.push(Self::shared_flag().to_string());
        if cfg!(target_os = "macos") {
            args.push("-undefined".to_string());
            args.push("dynamic_lookup".to_string());
        }
        args.push(c_path.display().to_string());
        args.push("-o".to_string());
        args.push(so_path.display().to_string());
        self.invoke(&args)
    }

    pub fn compile_object(&self, c_path: &Path, o_path: &Path) -> anyhow::Result<()> {
        let mut args = self.base_args();
        args.push("-c".to_string());
        args.push(c_path.display().to_string());
        args.push("-o".to_string());
        args.push(o_path.display().to_string());
        self.invoke(&args)
    }

    pub fn link_executable(
        &self,
        entry_c: &Path,
        objects: &[&Path],
        out: &Path,
    ) -> anyhow::Result<()> {
        let mut args = self.base_args();
        args.push(entry_c.display().to_string());
        for object in objects {
            args.push(object.display().to_string());
        }
        args.extend(self.runtime_objects.iter().cloned());
        args.push("-lm".to_string());
        if cfg!(target_os = "linux") {
            args.push("-ldl".to_string());
            // export the host's symbols to the modules it loads
            args.push("-Wl,-E".to_string());
        }
        args.push("-s".to_string());
        args.push("-o".to_string());
        args.push(out.display().to_string());
        self.invoke(&args)
    }

    fn invoke(&self, args: &[String]) -> anyhow::Result<()> {
        let output = Command::new(&self.cc)
            .args(args)
            .output()
            .with_context(|| format!("spawning '{}'", self.cc))?;
        if !output.status.success() {
            bail!(
                "{} exited with {}:\n{}",
                self.cc,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }
}
