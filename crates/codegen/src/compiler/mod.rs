/*
 * Copyright (c) 2026. Mikhail Kulik.
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! The C back end. Emits one translation unit per module against the Lua
//! 5.3 internal ABI: a native-calling-convention entry and a stack-based
//! adapter per function, a globals table addressed by the slots the
//! upvalues pass assigned, write barriers on every GC store into tables,
//! and the `luaopen_`/`_init`/`_types` surface the loader expects.

pub mod cwriter;
mod exp;
mod functions;
mod statement;

use cwriter::{c_string_literal, CWriter};
use functions::FuncEmitter;

use crate::hir::*;
use crate::type_checker::always_returns;
use crate::types::{serialize_module_type, MemberType, Type};
use crate::upvalues::ModuleLayout;

/// C identifier for a dotted module name: `foo.bar` → `foo_bar`.
pub fn mangle(module_name: &str) -> String {
    module_name.replace('.', "_")
}

/// Symbol of a function's native-ABI entry. The function part is mangled
/// too: implicit record constructors are named `R.new`.
pub fn native_name(module_name: &str, func: &str) -> String {
    format!("{}_{}_titan", mangle(module_name), mangle(func))
}

pub(crate) fn c_type(ty: &Type) -> &'static str {
    match ty {
        Type::Integer => "lua_Integer ",
        Type::Float => "lua_Number ",
        Type::Boolean | Type::Nil => "int ",
        Type::String => "TString *",
        Type::Array(_) => "Table *",
        Type::Function { .. } => "CClosure *",
        Type::Value | Type::Option(_) | Type::Nominal(_) => "TValue ",
        Type::Invalid | Type::Module(_) | Type::Foreign(_) | Type::TypeOf(_) => {
            unreachable!("type {} has no C representation", ty)
        }
    }
}

pub(crate) fn float_literal(x: f64) -> String {
    if x.is_finite() {
        format!("{:?}", x)
    } else if x > 0.0 {
        "HUGE_VAL".to_string()
    } else {
        "-HUGE_VAL".to_string()
    }
}

/// Emit the complete C source of a checked module.
pub fn emit_module(module: &TModule, layout: &ModuleLayout) -> String {
    let m = mangle(&module.name);
    let mut w = CWriter::new();

    emit_preamble(&mut w, module);
    emit_import_decls(&mut w, module);

    for (_, header) in &module.foreigns {
        w.line(&format!("#include \"{}\"", header));
    }
    if !module.foreigns.is_empty() {
        w.blank();
    }

    // module state
    w.line(&format!("Table *{}_globals = NULL;", m));
    for record in &module.records {
        w.line(&format!(
            "Table *{}_{}_typemt = NULL;",
            m,
            record.local_name()
        ));
    }
    for value in &module.values {
        if let TValueDecl::Var(v) = value {
            if v.exported {
                w.line(&format!("TValue *{}_{}_slot = NULL;", m, v.name));
            }
        }
    }
    w.line("static int _initialized = 0;");
    w.blank();

    // forward declarations
    for value in &module.values {
        if let TValueDecl::Func(f) = value {
            w.line(&format!("{};", native_signature(module, f)));
            w.line(&format!(
                "static int {}_{}_lua(lua_State *L);",
                m,
                mangle(&f.name)
            ));
        }
    }
    w.blank();

    for value in &module.values {
        if let TValueDecl::Func(f) = value {
            emit_native_function(&mut w, module, layout, f);
            emit_adapter(&mut w, module, f);
        }
    }

    emit_proxy(&mut w, module, layout);
    emit_types(&mut w, module);
    emit_init(&mut w, module, layout);
    emit_luaopen(&mut w, module);

    w.finish()
}

// ─── Preamble ────────────────────────────────────────────────────────────────

fn emit_preamble(w: &mut CWriter, module: &TModule) {
    for line in [
        "#include <stdlib.h>",
        "#include <string.h>",
        "#include \"luaconf.h\"",
        "",
        "#include \"lauxlib.h\"",
        "#include \"lualib.h\"",
        "",
        "#include \"lapi.h\"",
        "#include \"lgc.h\"",
        "#include \"ltable.h\"",
        "#include \"lfunc.h\"",
        "#include \"lstring.h\"",
        "#include \"lvm.h\"",
        "",
        "#include \"lobject.h\"",
        "",
        "#include <math.h>",
        "",
        "#ifdef __GNUC__",
        "#define TITAN_LIKELY(x)   __builtin_expect((x), 1)",
        "#define TITAN_UNLIKELY(x) __builtin_expect((x), 0)",
        "#else",
        "#define TITAN_LIKELY(x)   (x)",
        "#define TITAN_UNLIKELY(x) (x)",
        "#endif",
        "",
        "#define MAXNUMBER2STR 50",
        "",
        "#ifdef __clang__",
        "#pragma clang diagnostic ignored \"-Wunused-function\"",
        "#pragma clang diagnostic ignored \"-Wparentheses-equality\"",
        "#endif",
        "",
        "static char _cvtbuff[MAXNUMBER2STR];",
        "",
        "inline static TString* _integer2str (lua_State *L, lua_Integer i) {",
        "    size_t len;",
        "    len = lua_integer2str(_cvtbuff, sizeof(_cvtbuff), i);",
        "    return luaS_newlstr(L, _cvtbuff, len);",
        "}",
        "",
        "inline static TString* _float2str (lua_State *L, lua_Number f) {",
        "    size_t len;",
        "    len = lua_number2str(_cvtbuff, sizeof(_cvtbuff), f);",
        "    return luaS_newlstr(L, _cvtbuff, len);",
        "}",
        "",
        "inline static lua_Number _titan_fltmod (lua_Number a, lua_Number b) {",
        "    lua_Number m = l_mathop(fmod)(a, b);",
        "    if ((m * b) < 0) m += b;",
        "    return m;",
        "}",
        "",
        "inline static int _titan_streq (TString *a, TString *b) {",
        "    return a == b || (tsslen(a) == tsslen(b) &&",
        "        memcmp(getstr(a), getstr(b), tsslen(a)) == 0);",
        "}",
        "",
        "inline static int _titan_strcmp (TString *a, TString *b) {",
        "    size_t la = tsslen(a), lb = tsslen(b);",
        "    size_t lmin = la < lb ? la : lb;",
        "    int r = memcmp(getstr(a), getstr(b), lmin);",
        "    if (r != 0) return r;",
        "    return la < lb ? -1 : (la > lb ? 1 : 0);",
        "}",
        "",
        "/* concatenation: short results pack into a stack buffer and",
        "** intern; long ones allocate once and copy in order */",
        "inline static TString *_titan_concat (lua_State *L, int n, TString **parts) {",
        "    size_t len = 0;",
        "    int i;",
        "    for (i = 0; i < n; i++) len += tsslen(parts[i]);",
        "    if (len <= LUAI_MAXSHORTLEN) {",
        "        char buff[LUAI_MAXSHORTLEN];",
        "        char *p = buff;",
        "        for (i = 0; i < n; i++) {",
        "            memcpy(p, getstr(parts[i]), tsslen(parts[i]));",
        "            p += tsslen(parts[i]);",
        "        }",
        "        return luaS_newlstr(L, buff, len);",
        "    } else {",
        "        TString *res = luaS_createlngstrobj(L, len);",
        "        char *p = getstr(res);",
        "        for (i = 0; i < n; i++) {",
        "            memcpy(p, getstr(parts[i]), tsslen(parts[i]));",
        "            p += tsslen(parts[i]);",
        "        }",
        "        return res;",
        "    }",
        "}",
        "",
        "/* array store: the array part doubles when the index reaches",
        "** 2*sizearray, and every GC store is followed by a barrier */",
        "inline static void _titan_setarr (lua_State *L, Table *t, lua_Integer k, TValue *v) {",
        "    if (TITAN_UNLIKELY(l_castS2U(k) - 1 >= t->sizearray &&",
        "            l_castS2U(k) - 1 < 2 * cast(lua_Unsigned, t->sizearray))) {",
        "        luaH_resizearray(L, t, 2 * t->sizearray);",
        "    }",
        "    luaH_setint(L, t, k, v);",
        "    luaC_barrierback(L, t, v);",
        "}",
        "",
    ] {
        w.line(line);
    }

    if !module.imports.is_empty() {
        emit_loader_helpers(w);
    }
}

/// `dlopen`-based loading of imported modules, shared by every importing
/// module's `_init`.
fn emit_loader_helpers(w: &mut CWriter) {
    for line in [
        "#include <dlfcn.h>",
        "",
        "#define TITAN_VER          \"0.5\"",
        "#define TITAN_VER_SUFFIX   \"_0_5\"",
        "#define TITAN_PATH_VAR     \"TITAN_PATH\"",
        "#define TITAN_PATH_SEP     \"/\"",
        "#define TITAN_PATH_DEFAULT \".;/usr/local/lib/titan/\" TITAN_VER",
        "#define TITAN_PATH_KEY     \"ec10e486-d8fd-11e7-87f4-e7e9581a929c\"",
        "#define TITAN_LIBS_KEY     \"ecfc9174-d8fd-11e7-8be2-abbaa3ded45f\"",
        "",
        "#if defined(__GNUC__)",
        "#define cast_func(t,p) (__extension__ (t)(p))",
        "#else",
        "#define cast_func(t,p) ((t)(p))",
        "#endif",
        "",
        "static void pushpath (lua_State *L) {",
        "    lua_pushliteral(L, TITAN_PATH_KEY);",
        "    lua_rawget(L, LUA_REGISTRYINDEX);",
        "    if(lua_isnil(L, -1)) {",
        "        lua_pop(L, 1);",
        "        /* Try the versioned name for the Titan Path variable */",
        "        const char *path = getenv(TITAN_PATH_VAR TITAN_VER_SUFFIX);",
        "        if (path == NULL) {",
        "            /* Try the unversioned name for the Titan Path variable */",
        "            path = getenv(TITAN_PATH_VAR);",
        "        }",
        "        if (path == NULL) {",
        "            /* No Titan Path environment variable */",
        "            path = TITAN_PATH_DEFAULT;",
        "            lua_pushstring(L, path);",
        "        } else {",
        "            path = luaL_gsub(L, path, \";;\", \";\\1;\");",
        "            path = luaL_gsub(L, path, \"\\1\", TITAN_PATH_DEFAULT);",
        "            lua_remove(L, -2); /* remove result from 1st 'gsub' */",
        "        }",
        "        lua_pushliteral(L, TITAN_PATH_KEY);",
        "        lua_pushvalue(L, -2);",
        "        lua_rawset(L, LUA_REGISTRYINDEX);",
        "    }",
        "}",
        "",
        "static const char *pushnextdir (lua_State *L, const char *path) {",
        "    const char *l;",
        "    while (*path == ';') path++;  /* skip separators */",
        "    if (*path == '\\0') return NULL;  /* no more templates */",
        "    l = strchr(path, ';');  /* find next separator */",
        "    if (l == NULL) l = path + strlen(path);",
        "    lua_pushlstring(L, path, l - path);  /* template */",
        "    return l;",
        "}",
        "",
        "static int gctm (lua_State *L) {",
        "    lua_Integer n = luaL_len(L, 1);",
        "    /* for each handle, in reverse order */",
        "    for (; n >= 1; n--) {",
        "        lua_rawgeti(L, 1, n);  /* get handle LIBS[n] */",
        "        dlclose(lua_touserdata(L, -1));",
        "        lua_pop(L, 1);  /* pop handle */",
        "    }",
        "    return 0;",
        "}",
        "",
        "static void createlibstable (lua_State *L) {",
        "    lua_newtable(L);",
        "    lua_createtable(L, 0, 1);  /* create metatable */",
        "    lua_pushcfunction(L, gctm);",
        "    lua_setfield(L, -2, \"__gc\");  /* set finalizer */",
        "    lua_setmetatable(L, -2);",
        "    lua_pushliteral(L, TITAN_LIBS_KEY);",
        "    lua_pushvalue(L, -2);",
        "    lua_rawset(L, LUA_REGISTRYINDEX);",
        "}",
        "",
        "static void pushlibs(lua_State *L) {",
        "    lua_pushliteral(L, TITAN_LIBS_KEY);",
        "    lua_rawget(L, LUA_REGISTRYINDEX);",
        "    if(lua_isnil(L, -1)) {",
        "        lua_pop(L, 1);",
        "        createlibstable(L);",
        "    }",
        "}",
        "",
        "static void *loadlib (lua_State *L, const char *file) {",
        "    pushlibs(L);",
        "    lua_pushstring(L, file);",
        "    lua_rawget(L, -2); // try to get lib",
        "    if(!lua_isnil(L, -1)) {",
        "        void *lib = lua_touserdata(L, -1);",
        "        lua_pop(L, 2); // pop lib and libs table",
        "        return lib;",
        "    } else {",
        "        lua_pop(L, 1); // pop nil",
        "        pushpath(L);",
        "        const char *path = lua_tostring(L, -1);",
        "        while((path = pushnextdir(L, path)) != NULL) {",
        "            const char *dir = lua_tostring(L, -1);",
        "            lua_pushfstring(L, \"%s\" TITAN_PATH_SEP \"%s\", dir, file);",
        "            const char *filename = lua_tostring(L, -1);",
        "            void *lib = dlopen(filename, RTLD_NOW | RTLD_LOCAL);",
        "            if(lib != NULL) {",
        "                lua_pop(L, 3); // pop path, filename, and dir",
        "                lua_pushstring(L, file);",
        "                lua_pushlightuserdata(L, lib);",
        "                lua_rawset(L, -3); // add to libs table",
        "                lua_pop(L, 1); // pop libs table",
        "                return lib;",
        "            }",
        "            lua_pop(L, 2); // pop filename and dir",
        "        }",
        "        lua_pop(L, 2); // pop path and libs table",
        "        luaL_error(L, dlerror());",
        "        return NULL;",
        "    }",
        "}",
        "",
        "static void *loadsym (lua_State *L, void *lib, const char *sym) {",
        "    void *f = dlsym(lib, sym);",
        "    if(f == NULL) luaL_error(L, dlerror());",
        "    return f;",
        "}",
        "",
    ] {
        w.line(line);
    }
}

// ─── Imports ─────────────────────────────────────────────────────────────────

/// Distinct imported modules, in first-import order.
fn distinct_imports(module: &TModule) -> Vec<&TImport> {
    let mut seen: Vec<&str> = Vec::new();
    let mut result = Vec::new();
    for import in &module.imports {
        if !seen.contains(&import.module_name.as_str()) {
            seen.push(&import.module_name);
            result.push(import);
        }
    }
    result
}

/// The C function-pointer type of an imported function's native entry.
fn imported_fn_type(params: &[Type], rets: &[Type]) -> String {
    let mut parts = vec!["lua_State *".to_string(), "Table *".to_string()];
    parts.extend(params.iter().map(|t| c_type(t).trim_end().to_string()));
    parts.extend(
        rets.iter()
            .skip(1)
            .map(|t| format!("{}*", c_type(t))),
    );
    let ret = rets
        .first()
        .map(|t| c_type(t).trim_end().to_string())
        .unwrap_or_else(|| "int".to_string());
    format!("{} (*)({})", ret, parts.join(", "))
}

fn emit_import_decls(w: &mut CWriter, module: &TModule) {
    for import in distinct_imports(module) {
        let im = mangle(&import.module_name);
        w.line(&format!("static Table **{}_globals_ref = NULL;", im));
        for (name, member) in &import.ty.members {
            match member {
                MemberType::Func { params, rets } => {
                    let fn_type = imported_fn_type(params, rets);
                    // turn `T (*)(A)` into `T (*name)(A)`
                    let decl = fn_type.replacen("(*)", &format!("(*{}_{}_titan)", im, name), 1);
                    w.line(&format!("static {} = NULL;", decl));
                }
                MemberType::Var(_) => {
                    w.line(&format!("static TValue **{}_{}_slot_ref = NULL;", im, name));
                }
                MemberType::Record(record) => {
                    w.line(&format!(
                        "static Table **{}_{}_typemt_ref = NULL;",
                        im,
                        record.local_name()
                    ));
                }
            }
        }
    }
    if !module.imports.is_empty() {
        w.blank();
    }
}

// ─── Functions ───────────────────────────────────────────────────────────────

fn native_signature(module: &TModule, f: &TFunc) -> String {
    let ret = f
        .rets
        .first()
        .map(|t| c_type(t).to_string())
        .unwrap_or_else(|| "int ".to_string());
    let mut params = vec!["lua_State *L".to_string(), "Table *_mod".to_string()];
    for local in &f.locals[..f.param_count] {
        params.push(format!("{}_param_{}", c_type(&local.ty), local.name));
    }
    for (i, ty) in f.rets.iter().enumerate().skip(1) {
        params.push(format!("{}*_outparam_{}", c_type(ty), i + 1));
    }
    format!(
        "{}{}({})",
        ret,
        native_name(&module.name, &f.name),
        params.join(", ")
    )
}

fn emit_native_function(w: &mut CWriter, module: &TModule, layout: &ModuleLayout, f: &TFunc) {
    let mut fe = FuncEmitter::new(module, layout, f);
    let param_mirrors: Vec<(usize, Type, String)> = (0..f.param_count)
        .filter_map(|id| {
            fe.local_slot(id)
                .map(|slot| (slot, f.locals[id].ty.clone(), f.locals[id].name.clone()))
        })
        .collect();
    fe.block(&f.body);
    if !always_returns(&f.body) {
        fe.out.line("L->top = _base;");
        fe.out.line("return 0;");
    }
    let nslots = fe.slot_count();

    w.open(&format!("{} {{", native_signature(module, f)));
    w.line("luaC_checkGC(L);");
    if nslots > 0 {
        w.line("/* function preamble: reserve needed stack space */");
        w.open(&format!("if (L->stack_last - L->top > {}) {{", nslots));
        w.line(&format!(
            "if (L->ci->top < L->top + {}) L->ci->top = L->top + {};",
            nslots, nslots
        ));
        w.close("}");
        w.open("else {");
        w.line(&format!("lua_checkstack(L, {});", nslots));
        w.close("}");
        w.line("TValue *_base = L->top;");
        w.line(&format!("L->top += {};", nslots));
        w.open("for (TValue *_s = L->top - 1; _base <= _s; _s--) {");
        w.line("setnilvalue(_s);");
        w.close("}");
    } else {
        w.line("TValue *_base = L->top;");
    }
    // GC-typed parameters are mirrored before any allocation can happen
    for (slot, ty, name) in &param_mirrors {
        let store = functions::set_value(
            ty,
            &format!("(_base + {})", slot),
            &format!("_param_{}", name),
        );
        w.line(&store);
    }
    w.splice(fe.out);
    w.close("}");
    w.blank();
}

fn emit_adapter(w: &mut CWriter, module: &TModule, f: &TFunc) {
    let m = mangle(&module.name);
    let nparams = f.param_count;
    let nrets = f.rets.len();

    w.open(&format!(
        "static int {}_{}_lua(lua_State *L) {{",
        m,
        mangle(&f.name)
    ));
    w.line("TValue *func = L->ci->func;");
    w.open(&format!("if ((L->top - func - 1) != {}) {{", nparams));
    w.line(&format!(
        "luaL_error(L, \"calling Titan function %s with %d arguments, but expected %d\", \"{}\", (int)(L->top - func - 1), {});",
        f.name, nparams
    ));
    w.close("}");
    w.line("Table *_mod = hvalue(&(clCvalue(func)->upvalue[0]));");

    for (i, local) in f.locals[..nparams].iter().enumerate() {
        emit_stack_extract(
            w,
            module,
            &local.ty,
            &format!("(func + {})", i + 1),
            &format!("_param_{}", local.name),
            &local.name,
            &f.name,
        );
    }

    for (i, ty) in f.rets.iter().enumerate().skip(1) {
        match ty {
            Type::Value | Type::Option(_) | Type::Nominal(_) => {
                w.line(&format!("TValue _outparam_{};", i + 1));
                w.line(&format!("setnilvalue(&_outparam_{});", i + 1));
            }
            Type::String | Type::Array(_) | Type::Function { .. } => {
                w.line(&format!("{}_outparam_{} = NULL;", c_type(ty), i + 1));
            }
            _ => w.line(&format!("{}_outparam_{} = 0;", c_type(ty), i + 1)),
        }
    }

    if nrets > 0 {
        w.line(&format!("lua_checkstack(L, {});", nrets));
    }

    let mut call_args = vec!["L".to_string(), "_mod".to_string()];
    for local in &f.locals[..nparams] {
        call_args.push(format!("_param_{}", local.name));
    }
    for i in 1..nrets {
        call_args.push(format!("&_outparam_{}", i + 1));
    }
    let callee = native_name(&module.name, &f.name);
    match f.rets.first() {
        Some(ret0) => {
            w.line(&format!(
                "{}res = {}({});",
                c_type(ret0),
                callee,
                call_args.join(", ")
            ));
        }
        None => w.line(&format!("{}({});", callee, call_args.join(", "))),
    }

    if nrets > 0 {
        w.line("TValue *_firstret = L->top;");
        w.line(&format!("L->top += {};", nrets));
        let store = functions::set_value(&f.rets[0], "_firstret", "res");
        w.line(&store);
        w.line("_firstret++;");
        for (i, ty) in f.rets.iter().enumerate().skip(1) {
            let store = functions::set_value(ty, "_firstret", &format!("_outparam_{}", i + 1));
            w.line(&store);
            w.line("_firstret++;");
        }
    }
    w.line(&format!("return {};", nrets));
    w.close("}");
    w.blank();
}

/// Declare `name` and fill it from a stack value, trapping on a wrong
/// type. Used for adapter parameters and proxy writes.
#[allow(clippy::too_many_arguments)]
fn emit_stack_extract(
    w: &mut CWriter,
    module: &TModule,
    ty: &Type,
    tv: &str,
    name: &str,
    arg_name: &str,
    func_name: &str,
) {
    let trap = |expected: &str| {
        format!(
            "luaL_error(L, \"wrong type for argument %s of '%s', expected %s but found %s\", \"{}\", \"{}\", \"{}\", lua_typename(L, ttnov({})));",
            arg_name, func_name, expected, tv
        )
    };
    match ty {
        Type::Value | Type::Option(_) => {
            w.line(&format!("TValue {} = *{};", name, tv));
        }
        Type::Nominal(fqtn) => {
            let mt = functions::typemt_expr(module, fqtn);
            w.open(&format!(
                "if (TITAN_UNLIKELY(!ttistable({}) || hvalue({})->metatable != {})) {{",
                tv, tv, mt
            ));
            w.line(&trap(fqtn));
            w.close("}");
            w.line(&format!("TValue {} = *{};", name, tv));
        }
        Type::Integer => {
            w.line(&format!("lua_Integer {} = 0;", name));
            w.open(&format!("if (TITAN_LIKELY(ttisinteger({}))) {{", tv));
            w.line(&format!("{} = ivalue({});", name, tv));
            w.close("}");
            w.open(&format!(
                "else if (ttisfloat({}) && lua_numbertointeger(fltvalue({}), &{})) {{",
                tv, tv, name
            ));
            w.line("/* float with an exact integer representation */");
            w.close("}");
            w.open("else {");
            w.line(&trap("integer"));
            w.close("}");
        }
        Type::Float => {
            w.line(&format!("lua_Number {} = 0;", name));
            w.open(&format!("if (TITAN_LIKELY(ttisfloat({}))) {{", tv));
            w.line(&format!("{} = fltvalue({});", name, tv));
            w.close("}");
            w.open(&format!("else if (ttisinteger({})) {{", tv));
            w.line(&format!("{} = (lua_Number)ivalue({});", name, tv));
            w.close("}");
            w.open("else {");
            w.line(&trap("float"));
            w.close("}");
        }
        _ => {
            let (check, read, label): (&str, String, &str) = match ty {
                Type::Nil => ("ttisnil", "0".to_string(), "nil"),
                Type::Boolean => ("ttisboolean", format!("bvalue({})", tv), "boolean"),
                Type::String => ("ttisstring", format!("tsvalue({})", tv), "string"),
                Type::Array(_) => ("ttistable", format!("hvalue({})", tv), "table"),
                Type::Function { .. } => ("ttisCclosure", format!("clCvalue({})", tv), "function"),
                _ => unreachable!("adapter extract of {}", ty),
            };
            w.open(&format!("if (TITAN_UNLIKELY(!{}({}))) {{", check, tv));
            w.line(&trap(label));
            w.close("}");
            w.line(&format!("{}{} = {};", c_type(ty), name, read));
        }
    }
}

// ─── Module proxy ────────────────────────────────────────────────────────────

fn emit_proxy(w: &mut CWriter, module: &TModule, layout: &ModuleLayout) {
    let m = mangle(&module.name);

    w.open(&format!("static int {}__index(lua_State *L) {{", m));
    w.line("const char *_k = lua_tostring(L, 2);");
    w.open("if (_k != NULL) {");
    for (index, value) in module.values.iter().enumerate() {
        if !value.exported() {
            continue;
        }
        let slot = layout.value_slots[index];
        w.open(&format!("if (strcmp(_k, \"{}\") == 0) {{", value.name()));
        w.line(&format!(
            "setobj2s(L, L->top, &{}_globals->array[{}]);",
            m, slot
        ));
        w.line("L->top++;");
        w.line("return 1;");
        w.close("}");
    }
    w.close("}");
    w.line("lua_pushnil(L);");
    w.line("return 1;");
    w.close("}");
    w.blank();

    w.open(&format!("static int {}__newindex(lua_State *L) {{", m));
    w.line("const char *_k = lua_tostring(L, 2);");
    w.open("if (_k != NULL) {");
    for (index, value) in module.values.iter().enumerate() {
        if !value.exported() {
            continue;
        }
        let slot = layout.value_slots[index];
        match value {
            TValueDecl::Var(v) => {
                w.open(&format!("if (strcmp(_k, \"{}\") == 0) {{", v.name));
                emit_stack_extract(
                    w,
                    module,
                    &v.ty,
                    "(L->ci->func + 3)",
                    "_newval",
                    &v.name,
                    "__newindex",
                );
                w.line(&format!(
                    "TValue *_slot = &{}_globals->array[{}];",
                    m, slot
                ));
                let store = functions::set_value(&v.ty, "_slot", "_newval");
                w.line(&store);
                if v.ty.is_gc() {
                    w.line(&format!("luaC_barrierback(L, {}_globals, _slot);", m));
                }
                w.line("return 0;");
                w.close("}");
            }
            TValueDecl::Func(f) => {
                w.open(&format!("if (strcmp(_k, \"{}\") == 0) {{", f.name));
                w.line(&format!(
                    "return luaL_error(L, \"attempting to assign to toplevel constant function {}\");",
                    f.name
                ));
                w.close("}");
            }
        }
    }
    w.close("}");
    w.line(&format!(
        "return luaL_error(L, \"module '{}' has no member '%s'\", _k ? _k : \"?\");",
        module.name
    ));
    w.close("}");
    w.blank();
}

// ─── Module surface ──────────────────────────────────────────────────────────

fn emit_types(w: &mut CWriter, module: &TModule) {
    let m = mangle(&module.name);
    w.open(&format!("int {}_types(lua_State* L) {{", m));
    w.line(&format!(
        "lua_pushliteral(L, \"{}\");",
        serialize_module_type(&module.module_type)
    ));
    w.line("return 1;");
    w.close("}");
    w.blank();
}

fn emit_init(w: &mut CWriter, module: &TModule, layout: &ModuleLayout) {
    let m = mangle(&module.name);
    w.open(&format!("void {}_init(lua_State *L) {{", m));
    w.open("if(!_initialized) {");
    w.line("_initialized = 1;");

    for import in distinct_imports(module) {
        let im = mangle(&import.module_name);
        let so_path = format!("{}.so", import.module_name.replace('.', "/"));
        w.line(&format!(
            "void *{}_handle = loadlib(L, \"{}\");",
            im, so_path
        ));
        w.line(&format!(
            "void (*{}_init_fn)(lua_State *) = cast_func(void (*)(lua_State*), loadsym(L, {}_handle, \"{}_init\"));",
            im, im, im
        ));
        w.line(&format!("{}_init_fn(L);", im));
        w.line(&format!(
            "{}_globals_ref = (Table **)loadsym(L, {}_handle, \"{}_globals\");",
            im, im, im
        ));
        for (name, member) in &import.ty.members {
            match member {
                MemberType::Func { params, rets } => {
                    w.line(&format!(
                        "{}_{}_titan = cast_func({}, loadsym(L, {}_handle, \"{}_{}_titan\"));",
                        im,
                        name,
                        imported_fn_type(params, rets),
                        im,
                        im,
                        name
                    ));
                }
                MemberType::Var(_) => {
                    w.line(&format!(
                        "{}_{}_slot_ref = (TValue **)loadsym(L, {}_handle, \"{}_{}_slot\");",
                        im, name, im, im, name
                    ));
                }
                MemberType::Record(record) => {
                    w.line(&format!(
                        "{}_{}_typemt_ref = (Table **)loadsym(L, {}_handle, \"{}_{}_typemt\");",
                        im,
                        record.local_name(),
                        im,
                        im,
                        record.local_name()
                    ));
                }
            }
        }
    }

    for record in &module.records {
        w.line(&format!(
            "luaL_newmetatable(L, \"Titan record {}\"); /* push metatable */",
            record.fqtn
        ));
        w.line(&format!(
            "{}_{}_typemt = hvalue(L->top - 1);",
            m,
            record.local_name()
        ));
        w.line("L->top--;");
    }

    let nslots = layout.slot_count();
    w.line(&format!("lua_createtable(L, {}, 0);", nslots));
    w.line(&format!("{}_globals = hvalue(L->top - 1);", m));
    w.line("/* anchor the globals table in the registry */");
    w.line(&format!("lua_pushliteral(L, \"titan globals {}\");", module.name));
    w.line("lua_pushvalue(L, -2);");
    w.line("lua_rawset(L, LUA_REGISTRYINDEX);");
    w.line("lua_pop(L, 1);");

    for (i, literal) in layout.literals.iter().enumerate() {
        w.line(&format!(
            "setsvalue(L, &{}_globals->array[{}], luaS_newlstr(L, {}, {}));",
            m,
            i,
            c_string_literal(literal),
            literal.len()
        ));
    }

    for (index, value) in module.values.iter().enumerate() {
        let slot = layout.value_slots[index];
        match value {
            TValueDecl::Func(f) => {
                w.line(&format!("sethvalue(L, L->top, {}_globals);", m));
                w.line("L->top++;");
                w.line(&format!(
                    "lua_pushcclosure(L, {}_{}_lua, 1);",
                    m,
                    mangle(&f.name)
                ));
                w.line(&format!(
                    "setobj2t(L, &{}_globals->array[{}], L->top - 1);",
                    m, slot
                ));
                w.line("L->top--;");
            }
            TValueDecl::Var(v) => {
                let mut fe = FuncEmitter::for_init(module, layout);
                fe.emit_const_into_slot(&v.value, slot);
                w.splice(fe.out);
                if v.exported {
                    w.line(&format!(
                        "{}_{}_slot = &{}_globals->array[{}];",
                        m, v.name, m, slot
                    ));
                }
            }
        }
    }

    w.close("}");
    w.close("}");
    w.blank();
}

fn emit_luaopen(w: &mut CWriter, module: &TModule) {
    let m = mangle(&module.name);
    w.open(&format!("int luaopen_{}(lua_State *L) {{", m));
    w.line(&format!("{}_init(L);", m));
    w.line("lua_newtable(L);");
    w.line("lua_createtable(L, 0, 2);");
    w.line(&format!("lua_pushcfunction(L, {}__index);", m));
    w.line("lua_setfield(L, -2, \"__index\");");
    w.line(&format!("lua_pushcfunction(L, {}__newindex);", m));
    w.line("lua_setfield(L, -2, \"__newindex\");");
    w.line("lua_setmetatable(L, -2);");
    w.line("return 1;");
    w.close("}");
}
