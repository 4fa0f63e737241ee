//! Per-module pipeline orchestration: locates sources and compiled
//! artifacts, drives the checker and the C emitter, and hands the
//! generated C to the external toolchain. Diagnostics go to stderr in
//! filename order; the exit code distinguishes diagnostics (1) from
//! toolchain failures (2).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use codegen::loader::{ImportError, Loader};
use codegen::types::{parse_module_type, MemberType, ModuleType, Type};
use codegen::{CompileError, Session};

use crate::toolchain::Toolchain;

const TITAN_PATH_DEFAULT: &str = ".;/usr/local/lib/titan/0.5";

pub struct Options {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub print_ast: bool,
    pub print_types: bool,
}

pub fn run(options: Options) -> anyhow::Result<i32> {
    let source = fs::read_to_string(&options.input)
        .with_context(|| format!("reading {}", options.input.display()))?;
    let file = options.input.display().to_string();
    let module_name = module_name_of(&options.input);

    if options.print_ast {
        match parser::parse(&source) {
            Ok(program) => {
                print!("{}", ast::pretty::program(&program));
                return Ok(0);
            }
            Err(err) => {
                eprintln!(
                    "{}: syntax error: {}",
                    ast::loc::describe(&file, &source, err.span().start),
                    err
                );
                return Ok(1);
            }
        }
    }

    let mut session = Session::new();
    let mut loader = FsLoader::new(search_path(raw_search_path()), Toolchain::from_env());
    loader.in_progress.insert(module_name.clone());

    if options.print_types {
        return match codegen::check_only(&module_name, &source, &mut session, &mut loader) {
            Ok(module) => {
                println!("{:#?}", module);
                Ok(0)
            }
            Err(err) => {
                print_diagnostics(&file, &source, &err);
                Ok(1)
            }
        };
    }

    let compiled = match codegen::compile(&module_name, &source, &mut session, &mut loader) {
        Ok(compiled) => compiled,
        Err(err) => {
            print_diagnostics(&file, &source, &err);
            return Ok(1);
        }
    };

    let c_path = options
        .output
        .clone()
        .map(|p| p.with_extension("c"))
        .unwrap_or_else(|| options.input.with_extension("c"));
    fs::write(&c_path, &compiled.c_source)
        .with_context(|| format!("writing {}", c_path.display()))?;

    let is_program = exports_main(&compiled.module_type);
    let toolchain = Toolchain::from_env();

    if is_program {
        build_program(
            &toolchain,
            &module_name,
            &c_path,
            &options,
            &loader.compiled_units,
        )
    } else {
        let so_path = c_path.with_extension("so");
        if let Err(err) = toolchain.compile_shared(&c_path, &so_path) {
            eprintln!("titanc: {:#}", err);
            // the generated C is kept for debugging
            return Ok(2);
        }
        fs::write(so_path.with_extension("types"), &compiled.type_text)
            .with_context(|| "writing the .types sidecar")?;
        Ok(0)
    }
}

/// A module is a program when it exports `main({string}): integer`.
fn exports_main(ty: &ModuleType) -> bool {
    matches!(
        ty.member("main"),
        Some(MemberType::Func { params, rets })
            if params.len() == 1
                && params[0] == Type::array(Type::String)
                && rets == &[Type::Integer]
    )
}

fn build_program(
    toolchain: &Toolchain,
    module_name: &str,
    c_path: &Path,
    options: &Options,
    imports: &[CompiledUnit],
) -> anyhow::Result<i32> {
    let mut objects = Vec::new();
    for unit in imports {
        let o_path = unit.c_path.with_extension("o");
        if let Err(err) = toolchain.compile_object(&unit.c_path, &o_path) {
            eprintln!("titanc: {:#}", err);
            return Ok(2);
        }
        objects.push((unit.module_name.clone(), o_path));
    }
    let main_o = c_path.with_extension("o");
    if let Err(err) = toolchain.compile_object(c_path, &main_o) {
        eprintln!("titanc: {:#}", err);
        return Ok(2);
    }
    objects.push((module_name.to_string(), main_o));

    let entry_path = c_path.with_file_name(format!(
        "{}__entrypoint.c",
        c_path.file_stem().and_then(|s| s.to_str()).unwrap_or("main")
    ));
    let module_names: Vec<&str> = objects.iter().map(|(n, _)| n.as_str()).collect();
    fs::write(&entry_path, entry_point_stub(module_name, &module_names))
        .with_context(|| format!("writing {}", entry_path.display()))?;

    let exe_path = options
        .output
        .clone()
        .unwrap_or_else(|| options.input.with_extension(""));
    let object_paths: Vec<&Path> = objects.iter().map(|(_, p)| p.as_path()).collect();
    if let Err(err) = toolchain.link_executable(&entry_path, &object_paths, &exe_path) {
        eprintln!("titanc: {:#}", err);
        return Ok(2);
    }
    Ok(0)
}

/// The tiny C entry point of a program build: opens the host state,
/// preloads every module of the build, requires the main module, and
/// calls its `main` with the argument list.
fn entry_point_stub(main_module: &str, modules: &[&str]) -> String {
    let mut out = String::new();
    out.push_str("#include <stdio.h>\n");
    out.push_str("#include \"lua.h\"\n");
    out.push_str("#include \"lauxlib.h\"\n");
    out.push_str("#include \"lualib.h\"\n\n");
    for module in modules {
        out.push_str(&format!(
            "int luaopen_{}(lua_State *L);\n",
            module.replace('.', "_")
        ));
    }
    out.push_str("\nint main(int argc, char *argv[]) {\n");
    out.push_str("    lua_State *L = luaL_newstate();\n");
    out.push_str("    if (L == NULL) {\n");
    out.push_str("        fprintf(stderr, \"cannot create Lua state\\n\");\n");
    out.push_str("        return 1;\n");
    out.push_str("    }\n");
    out.push_str("    luaL_openlibs(L);\n");
    out.push_str("    luaL_getsubtable(L, LUA_REGISTRYINDEX, \"_PRELOAD\");\n");
    for module in modules {
        out.push_str(&format!(
            "    lua_pushcfunction(L, luaopen_{});\n",
            module.replace('.', "_")
        ));
        out.push_str(&format!("    lua_setfield(L, -2, \"{}\");\n", module));
    }
    out.push_str("    lua_pop(L, 1);\n");
    out.push_str("    lua_getglobal(L, \"require\");\n");
    out.push_str(&format!("    lua_pushliteral(L, \"{}\");\n", main_module));
    out.push_str("    if (lua_pcall(L, 1, 1, 0) != LUA_OK) {\n");
    out.push_str("        fprintf(stderr, \"%s\\n\", lua_tostring(L, -1));\n");
    out.push_str("        return 1;\n");
    out.push_str("    }\n");
    out.push_str("    lua_getfield(L, -1, \"main\");\n");
    out.push_str("    lua_createtable(L, argc > 0 ? argc - 1 : 0, 0);\n");
    out.push_str("    for (int i = 1; i < argc; i++) {\n");
    out.push_str("        lua_pushstring(L, argv[i]);\n");
    out.push_str("        lua_rawseti(L, -2, i);\n");
    out.push_str("    }\n");
    out.push_str("    if (lua_pcall(L, 1, 1, 0) != LUA_OK) {\n");
    out.push_str("        fprintf(stderr, \"%s\\n\", lua_tostring(L, -1));\n");
    out.push_str("        return 1;\n");
    out.push_str("    }\n");
    out.push_str("    int code = (int)lua_tointeger(L, -1);\n");
    out.push_str("    lua_close(L);\n");
    out.push_str("    return code;\n");
    out.push_str("}\n");
    out
}

fn print_diagnostics(file: &str, source: &str, err: &CompileError) {
    for line in err.render(file, source) {
        eprintln!("{}", line);
    }
}

/// Module name of a source path: the file stem, prefixed by directories
/// below the current one when present (`foo/bar.titan` → `foo.bar`).
fn module_name_of(input: &Path) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("main")
        .to_string();
    match input.parent() {
        Some(parent) if parent.as_os_str().is_empty() => stem,
        Some(parent) => {
            let mut parts: Vec<String> = parent
                .components()
                .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
                .filter(|c| c != ".")
                .collect();
            parts.push(stem);
            parts.join(".")
        }
        None => stem,
    }
}

fn raw_search_path() -> String {
    std::env::var("TITAN_PATH_0_5")
        .or_else(|_| std::env::var("TITAN_PATH"))
        .unwrap_or_else(|_| TITAN_PATH_DEFAULT.to_string())
}

/// Split a `;`-separated search path, expanding `;;` to the default.
fn search_path(raw: String) -> Vec<PathBuf> {
    raw.replace(";;", &format!(";{};", TITAN_PATH_DEFAULT))
        .split(';')
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}

pub struct CompiledUnit {
    pub module_name: String,
    pub c_path: PathBuf,
}

/// Filesystem loader: resolves `foo.bar` to `foo/bar.titan` (source) or
/// `foo/bar.so` with its `.types` sidecar (compiled, preferred when
/// newer), memoizes, and reports cycles through the in-progress set.
pub struct FsLoader {
    search_dirs: Vec<PathBuf>,
    toolchain: Toolchain,
    loaded: HashMap<String, ModuleType>,
    in_progress: HashSet<String>,
    /// Modules compiled from source during this build, for program links.
    pub compiled_units: Vec<CompiledUnit>,
}

impl FsLoader {
    pub fn new(search_dirs: Vec<PathBuf>, toolchain: Toolchain) -> Self {
        Self {
            search_dirs,
            toolchain,
            loaded: HashMap::new(),
            in_progress: HashSet::new(),
            compiled_units: Vec::new(),
        }
    }

    fn find(&self, relative: &str) -> Option<PathBuf> {
        self.search_dirs
            .iter()
            .map(|dir| dir.join(relative))
            .find(|p| p.exists())
    }

    /// Prefer a compiled artifact over the source when it is newer.
    fn newer(a: &Path, b: &Path) -> bool {
        match (fs::metadata(a).and_then(|m| m.modified()), fs::metadata(b).and_then(|m| m.modified())) {
            (Ok(ta), Ok(tb)) => ta >= tb,
            _ => false,
        }
    }

    fn load_compiled(&self, so_path: &Path) -> Option<ModuleType> {
        let text = fs::read_to_string(so_path.with_extension("types")).ok()?;
        parse_module_type(&text)
    }
}

impl Loader for FsLoader {
    fn load(&mut self, session: &mut Session, module_name: &str) -> Result<ModuleType, ImportError> {
        if let Some(ty) = self.loaded.get(module_name) {
            return Ok(ty.clone());
        }
        if self.in_progress.contains(module_name) {
            return Err(ImportError::Circular(module_name.to_string()));
        }

        let relative = module_name.replace('.', "/");
        let source_path = self.find(&format!("{}.titan", relative));
        let so_path = self.find(&format!("{}.so", relative));

        // a compiled module that is at least as new as its source wins
        if let Some(so) = &so_path {
            let up_to_date = match &source_path {
                Some(src) => Self::newer(so, src),
                None => true,
            };
            if up_to_date {
                if let Some(ty) = self.load_compiled(so) {
                    self.loaded.insert(module_name.to_string(), ty.clone());
                    return Ok(ty);
                }
            }
        }

        let source_path =
            source_path.ok_or_else(|| ImportError::NotFound(module_name.to_string()))?;
        let source = fs::read_to_string(&source_path).map_err(|e| {
            ImportError::Failed(module_name.to_string(), e.to_string())
        })?;

        self.in_progress.insert(module_name.to_string());
        let result = codegen::compile(module_name, &source, session, self);
        self.in_progress.remove(module_name);

        let compiled = result.map_err(|err| {
            let first = match &err {
                CompileError::Syntax(e) => e.to_string(),
                CompileError::Check(errors) => errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "unknown error".to_string()),
            };
            ImportError::Failed(module_name.to_string(), first)
        })?;

        let c_path = source_path.with_extension("c");
        let so_out = source_path.with_extension("so");
        fs::write(&c_path, &compiled.c_source)
            .map_err(|e| ImportError::Failed(module_name.to_string(), e.to_string()))?;
        self.toolchain
            .compile_shared(&c_path, &so_out)
            .map_err(|e| ImportError::Failed(module_name.to_string(), format!("{:#}", e)))?;
        let _ = fs::write(so_out.with_extension("types"), &compiled.type_text);

        self.compiled_units.push(CompiledUnit {
            module_name: module_name.to_string(),
            c_path,
        });
        self.loaded
            .insert(module_name.to_string(), compiled.module_type.clone());
        Ok(compiled.module_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_expansion() {
        let dirs = search_path("a;b".to_string());
        assert_eq!(dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);

        // `;;` expands to the default path
        let dirs = search_path("a;;b".to_string());
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("a"),
                PathBuf::from("."),
                PathBuf::from("/usr/local/lib/titan/0.5"),
                PathBuf::from("b"),
            ]
        );
    }

    #[test]
    fn test_module_name_of_paths() {
        assert_eq!(module_name_of(Path::new("bar.titan")), "bar");
        assert_eq!(module_name_of(Path::new("foo/bar.titan")), "foo.bar");
        assert_eq!(module_name_of(Path::new("./bar.titan")), "bar");
    }

    #[test]
    fn test_exports_main_signature() {
        use codegen::types::MemberType;
        let module = ModuleType {
            name: "m".to_string(),
            members: vec![(
                "main".to_string(),
                MemberType::Func {
                    params: vec![Type::array(Type::String)],
                    rets: vec![Type::Integer],
                },
            )],
        };
        assert!(exports_main(&module));

        let not_program = ModuleType {
            name: "m".to_string(),
            members: vec![(
                "main".to_string(),
                MemberType::Func {
                    params: vec![],
                    rets: vec![],
                },
            )],
        };
        assert!(!exports_main(&not_program));
    }
}
