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

//! Semantic types, the nominal record registry, and the serialized module
//! type notation embedded in generated modules (`<mod>_types`) and in the
//! `.types` sidecar next to compiled artifacts.

use std::collections::HashMap;
use std::fmt;

/// A semantic type. `Nominal` refers to a record through its fully
/// qualified name; the record definition itself lives in the registry, so
/// mutually recursive records resolve by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Nil,
    Boolean,
    Integer,
    Float,
    String,
    /// The dynamic supertype: anything flows in, extraction is checked at
    /// runtime.
    Value,
    /// The type of an expression whose checking already failed. Propagates
    /// without producing further diagnostics.
    Invalid,
    Array(Box<Type>),
    Function {
        params: Vec<Type>,
        rets: Vec<Type>,
        vararg: bool,
    },
    Nominal(String),
    Option(Box<Type>),
    /// An imported module, usable only for member access.
    Module(String),
    /// A foreign (C header) import.
    Foreign(String),
    /// A record name used as a value: carries the constructor.
    TypeOf(String),
}

impl Type {
    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn option(base: Type) -> Type {
        Type::Option(Box::new(base))
    }

    /// Whether values of this type are garbage-collected (and so need a
    /// stack slot while live in generated code).
    pub fn is_gc(&self) -> bool {
        matches!(
            self,
            Type::String
                | Type::Array(_)
                | Type::Function { .. }
                | Type::Nominal(_)
                | Type::Value
                | Type::Option(_)
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Float)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Nil => f.write_str("nil"),
            Type::Boolean => f.write_str("boolean"),
            Type::Integer => f.write_str("integer"),
            Type::Float => f.write_str("float"),
            Type::String => f.write_str("string"),
            Type::Value => f.write_str("value"),
            Type::Invalid => f.write_str("invalid type"),
            Type::Array(elem) => write!(f, "{{{}}}", elem),
            Type::Function { params, rets, .. } => {
                f.write_str("(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                f.write_str(") -> (")?;
                for (i, r) in rets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", r)?;
                }
                f.write_str(")")
            }
            Type::Nominal(fqtn) => f.write_str(fqtn),
            Type::Option(base) => write!(f, "{}?", base),
            Type::Module(name) => write!(f, "module '{}'", name),
            Type::Foreign(name) => write!(f, "foreign module '{}'", name),
            Type::TypeOf(fqtn) => write!(f, "record type {}", fqtn),
        }
    }
}

/// A record definition. Field order is declaration order and fixes the
/// runtime layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub fqtn: String,
    pub fields: Vec<(String, Type)>,
}

impl RecordType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    /// Short name without the module prefix.
    pub fn local_name(&self) -> &str {
        match self.fqtn.rfind('.') {
            Some(dot) => &self.fqtn[dot + 1..],
            None => &self.fqtn,
        }
    }
}

/// The session-wide registry of record definitions, keyed by fully
/// qualified name. Populated monotonically; two modules naming `m.R`
/// resolve to the same definition.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: HashMap<String, RecordType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fqtn: &str) -> Option<&RecordType> {
        self.records.get(fqtn)
    }

    /// Insert a record definition. The first definition of a name wins;
    /// re-registering the same module's records on a repeated load is a
    /// no-op.
    pub fn register(&mut self, record: RecordType) {
        self.records.entry(record.fqtn.clone()).or_insert(record);
    }
}

/// The exported surface of a module, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleType {
    pub name: String,
    pub members: Vec<(String, MemberType)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberType {
    Var(Type),
    Func { params: Vec<Type>, rets: Vec<Type> },
    Record(RecordType),
}

impl ModuleType {
    pub fn member(&self, name: &str) -> Option<&MemberType> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
    }
}

// ─── Serialization ───────────────────────────────────────────────────────────

/// Serialize a module type into the notation embedded by `<mod>_types`,
/// e.g. `Module('m',{f = ModuleMember('m', 'f', Function({Integer()},{Float()},false))})`.
pub fn serialize_module_type(module: &ModuleType) -> String {
    let mut out = String::new();
    out.push_str(&format!("Module('{}',{{", module.name));
    for (i, (name, member)) in module.members.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!(
            "{} = ModuleMember('{}', '{}', ",
            name, module.name, name
        ));
        match member {
            MemberType::Var(ty) => out.push_str(&serialize_type(ty)),
            MemberType::Func { params, rets } => {
                out.push_str(&format!(
                    "Function({},{},false)",
                    serialize_type_list(params),
                    serialize_type_list(rets)
                ));
            }
            MemberType::Record(record) => out.push_str(&serialize_record(record)),
        }
        out.push(')');
    }
    out.push_str("})");
    out
}

fn serialize_type_list(types: &[Type]) -> String {
    let items: Vec<String> = types.iter().map(serialize_type).collect();
    format!("{{{}}}", items.join(","))
}

fn serialize_record(record: &RecordType) -> String {
    let mut out = format!("Record('{}',{{", record.fqtn);
    for (i, (name, ty)) in record.fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!(
            "Field('{}', '{}', {}, {})",
            record.fqtn,
            name,
            serialize_type(ty),
            i + 1
        ));
    }
    let field_types: Vec<Type> = record.fields.iter().map(|(_, t)| t.clone()).collect();
    out.push_str(&format!(
        "}},{{new = StaticMethod('{}', 'new',{},{{Nominal('{}')}})}},{{}}, {{}})",
        record.fqtn,
        serialize_type_list(&field_types),
        record.fqtn
    ));
    out
}

fn serialize_type(ty: &Type) -> String {
    match ty {
        Type::Nil => "Nil()".to_string(),
        Type::Boolean => "Boolean()".to_string(),
        Type::Integer => "Integer()".to_string(),
        Type::Float => "Float()".to_string(),
        Type::String => "String()".to_string(),
        Type::Value => "Value()".to_string(),
        Type::Array(elem) => format!("Array({})", serialize_type(elem)),
        Type::Function { params, rets, vararg } => format!(
            "Function({},{},{})",
            serialize_type_list(params),
            serialize_type_list(rets),
            vararg
        ),
        Type::Nominal(fqtn) => format!("Nominal('{}')", fqtn),
        Type::Option(base) => format!("Option({})", serialize_type(base)),
        Type::Invalid
        | Type::Module(_)
        | Type::Foreign(_)
        | Type::TypeOf(_) => unreachable!("type {} is never serialized", ty),
    }
}

/// Parse the notation produced by [`serialize_module_type`]. Used by the
/// loader to type imports of already-compiled modules from the `.types`
/// sidecar without reparsing their source.
pub fn parse_module_type(text: &str) -> Option<ModuleType> {
    let mut p = TypeTextParser {
        bytes: text.as_bytes(),
        pos: 0,
    };
    let module = p.module()?;
    p.skip_ws();
    if p.pos != p.bytes.len() {
        return None;
    }
    Some(module)
}

struct TypeTextParser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl TypeTextParser<'_> {
    fn skip_ws(&mut self) {
        while self.bytes.get(self.pos).is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &str) -> Option<()> {
        self.skip_ws();
        if self.bytes[self.pos..].starts_with(token.as_bytes()) {
            self.pos += token.len();
            Some(())
        } else {
            None
        }
    }

    fn ident(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
    }

    fn quoted(&mut self) -> Option<String> {
        self.eat("'")?;
        let start = self.pos;
        while self.bytes.get(self.pos).is_some_and(|b| *b != b'\'') {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
        self.eat("'")?;
        Some(text)
    }

    fn module(&mut self) -> Option<ModuleType> {
        self.eat("Module(")?;
        let name = self.quoted()?;
        self.eat(",")?;
        self.eat("{")?;
        let mut members = Vec::new();
        loop {
            self.skip_ws();
            if self.bytes.get(self.pos) == Some(&b'}') {
                self.pos += 1;
                break;
            }
            let member_name = self.ident()?;
            self.eat("=")?;
            self.eat("ModuleMember(")?;
            let _mod = self.quoted()?;
            self.eat(",")?;
            let _name = self.quoted()?;
            self.eat(",")?;
            let member = self.member()?;
            self.eat(")")?;
            members.push((member_name, member));
            let _ = self.eat(",");
        }
        self.eat(")")?;
        Some(ModuleType { name, members })
    }

    fn member(&mut self) -> Option<MemberType> {
        self.skip_ws();
        if self.bytes[self.pos..].starts_with(b"Record(") {
            return self.record().map(MemberType::Record);
        }
        if self.bytes[self.pos..].starts_with(b"Function(") {
            match self.ty()? {
                Type::Function { params, rets, .. } => return Some(MemberType::Func { params, rets }),
                _ => return None,
            }
        }
        self.ty().map(MemberType::Var)
    }

    fn record(&mut self) -> Option<RecordType> {
        self.eat("Record(")?;
        let fqtn = self.quoted()?;
        self.eat(",")?;
        self.eat("{")?;
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            if self.bytes.get(self.pos) == Some(&b'}') {
                self.pos += 1;
                break;
            }
            self.eat("Field(")?;
            let _fqtn = self.quoted()?;
            self.eat(",")?;
            let name = self.quoted()?;
            self.eat(",")?;
            let ty = self.ty()?;
            self.eat(",")?;
            let _index = self.ident()?;
            self.eat(")")?;
            fields.push((name, ty));
            let _ = self.eat(",");
        }
        // statics, methods and metamethods tables: skip balanced braces
        self.eat(",")?;
        self.skip_table()?;
        self.eat(",")?;
        self.skip_table()?;
        self.eat(",")?;
        self.skip_table()?;
        self.eat(")")?;
        Some(RecordType { fqtn, fields })
    }

    fn skip_table(&mut self) -> Option<()> {
        self.eat("{")?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bytes.get(self.pos)? {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                _ => {}
            }
            self.pos += 1;
        }
        Some(())
    }

    fn ty(&mut self) -> Option<Type> {
        let head = self.ident()?;
        self.eat("(")?;
        let ty = match head.as_str() {
            "Nil" => Type::Nil,
            "Boolean" => Type::Boolean,
            "Integer" => Type::Integer,
            "Float" => Type::Float,
            "String" => Type::String,
            "Value" => Type::Value,
            "Array" => Type::array(self.ty()?),
            "Option" => Type::option(self.ty()?),
            "Nominal" => Type::Nominal(self.quoted()?),
            "Function" => {
                let params = self.ty_list()?;
                self.eat(",")?;
                let rets = self.ty_list()?;
                self.eat(",")?;
                let vararg = self.ident()? == "true";
                Type::Function { params, rets, vararg }
            }
            _ => return None,
        };
        self.eat(")")?;
        Some(ty)
    }

    fn ty_list(&mut self) -> Option<Vec<Type>> {
        self.eat("{")?;
        let mut types = Vec::new();
        loop {
            self.skip_ws();
            if self.bytes.get(self.pos) == Some(&b'}') {
                self.pos += 1;
                return Some(types);
            }
            types.push(self.ty()?);
            let _ = self.eat(",");
        }
    }
}
