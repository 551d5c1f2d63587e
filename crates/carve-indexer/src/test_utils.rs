//! Class file writer for fixtures
//!
//! Assembles real class-file bytes from a small description so the
//! reference fold and the unit builder can be exercised without a JVM
//! toolchain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::classfile::{ACC_INTERFACE, MAGIC};

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_ABSTRACT: u16 = 0x0400;

const CONSTANT_UTF8: u8 = 1;
const CONSTANT_INTEGER: u8 = 3;
const CONSTANT_CLASS: u8 = 7;
const CONSTANT_STRING: u8 = 8;
const CONSTANT_FIELDREF: u8 = 9;
const CONSTANT_METHODREF: u8 = 10;
const CONSTANT_INTERFACE_METHODREF: u8 = 11;
const CONSTANT_NAME_AND_TYPE: u8 = 12;
const CONSTANT_INVOKE_DYNAMIC: u8 = 18;

/// Opcodes the writer emits.
pub mod opcodes {
    pub const LDC: u8 = 0x12;
    pub const LDC_W: u8 = 0x13;
    pub const IINC: u8 = 0x84;
    pub const TABLESWITCH: u8 = 0xaa;
    pub const LOOKUPSWITCH: u8 = 0xab;
    pub const GETSTATIC: u8 = 0xb2;
    pub const PUTSTATIC: u8 = 0xb3;
    pub const GETFIELD: u8 = 0xb4;
    pub const PUTFIELD: u8 = 0xb5;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESPECIAL: u8 = 0xb7;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
    pub const INVOKEDYNAMIC: u8 = 0xba;
    pub const NEW: u8 = 0xbb;
    pub const ANEWARRAY: u8 = 0xbd;
    pub const CHECKCAST: u8 = 0xc0;
    pub const INSTANCEOF: u8 = 0xc1;
    pub const WIDE: u8 = 0xc4;
    pub const MULTIANEWARRAY: u8 = 0xc5;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementSpec {
    Int(i32),
    Str(String),
    Enum { descriptor: String, name: String },
    /// Class literal, given as a return descriptor.
    Class(String),
    Annotation(AnnotationSpec),
    Array(Vec<ElementSpec>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSpec {
    pub descriptor: String,
    pub elements: Vec<(String, ElementSpec)>,
}

impl AnnotationSpec {
    pub fn marker(descriptor: &str) -> Self {
        AnnotationSpec {
            descriptor: descriptor.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: ElementSpec) -> Self {
        self.elements.push((name.to_string(), value));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotationSpec {
    pub target_type: u8,
    /// Raw `target_info` bytes, which must match `target_type`.
    pub target_info: Vec<u8>,
    pub type_path: Vec<(u8, u8)>,
    pub annotation: AnnotationSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeSpec {
    Signature(String),
    Exceptions(Vec<String>),
    Annotations {
        visible: bool,
        annotations: Vec<AnnotationSpec>,
    },
    ParameterAnnotations {
        visible: bool,
        parameters: Vec<Vec<AnnotationSpec>>,
    },
    TypeAnnotations {
        visible: bool,
        annotations: Vec<TypeAnnotationSpec>,
    },
    AnnotationDefault(ElementSpec),
    Code(CodeSpec),
    /// `(name, descriptor)` rows of a `LocalVariableTable`.
    LocalVariables(Vec<(String, String)>),
    /// Any other attribute, written verbatim.
    Raw { name: String, bytes: Vec<u8> },
}

/// An instruction to assemble. Operands naming classes or members are
/// interned into the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// `new`, `anewarray`, `checkcast` or `instanceof`.
    Type(u8, String),
    MultiANewArray(String, u8),
    LdcClass(String),
    LdcWClass(String),
    LdcString(String),
    Field {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    Invoke {
        opcode: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    InvokeDynamic {
        name: String,
        descriptor: String,
    },
    TableSwitch {
        low: i32,
        high: i32,
    },
    LookupSwitch {
        keys: Vec<i32>,
    },
    WideIinc,
    Raw(Vec<u8>),
}

impl Op {
    pub fn invoke(opcode: u8, owner: &str, name: &str, descriptor: &str) -> Op {
        Op::Invoke {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    pub fn field(opcode: u8, owner: &str, name: &str, descriptor: &str) -> Op {
        Op::Field {
            opcode,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeSpec {
    pub ops: Vec<Op>,
    /// Catch types of the exception table; `None` writes a `finally` handler.
    pub handlers: Vec<Option<String>>,
    pub attributes: Vec<AttributeSpec>,
}

impl CodeSpec {
    pub fn new(ops: Vec<Op>) -> Self {
        CodeSpec {
            ops,
            ..CodeSpec::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberSpec {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub attributes: Vec<AttributeSpec>,
}

impl MemberSpec {
    pub fn new(name: &str, descriptor: &str) -> Self {
        MemberSpec {
            access_flags: ACC_PUBLIC,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn with(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Describes one class and renders it to class-file bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFileWriter {
    access_flags: u16,
    this_class: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<MemberSpec>,
    methods: Vec<MemberSpec>,
    attributes: Vec<AttributeSpec>,
}

impl ClassFileWriter {
    /// A public class extending `java/lang/Object`.
    pub fn new(internal_name: &str) -> Self {
        ClassFileWriter {
            access_flags: ACC_PUBLIC | ACC_SUPER,
            this_class: internal_name.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn interface(mut self) -> Self {
        self.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        self
    }

    pub fn access_flags(mut self, flags: u16) -> Self {
        self.access_flags = flags;
        self
    }

    pub fn extends(mut self, internal_name: &str) -> Self {
        self.super_class = Some(internal_name.to_string());
        self
    }

    pub fn no_superclass(mut self) -> Self {
        self.super_class = None;
        self
    }

    pub fn implements(mut self, internal_name: &str) -> Self {
        self.interfaces.push(internal_name.to_string());
        self
    }

    pub fn field(self, name: &str, descriptor: &str) -> Self {
        self.field_with(MemberSpec::new(name, descriptor))
    }

    pub fn field_with(mut self, field: MemberSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(self, name: &str, descriptor: &str, code: CodeSpec) -> Self {
        self.method_with(MemberSpec::new(name, descriptor).with(AttributeSpec::Code(code)))
    }

    pub fn method_with(mut self, method: MemberSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn internal_name(&self) -> &str {
        &self.this_class
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pool = PoolWriter::default();
        let mut body = Vec::new();

        put_u2(&mut body, self.access_flags);
        put_u2(&mut body, pool.class(&self.this_class));
        let super_index = self.super_class.as_deref().map_or(0, |s| pool.class(s));
        put_u2(&mut body, super_index);
        put_u2(&mut body, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            put_u2(&mut body, pool.class(interface));
        }
        for members in [&self.fields, &self.methods] {
            put_u2(&mut body, members.len() as u16);
            for member in members {
                put_u2(&mut body, member.access_flags);
                put_u2(&mut body, pool.utf8(&member.name));
                put_u2(&mut body, pool.utf8(&member.descriptor));
                write_attributes(&mut body, &mut pool, &member.attributes);
            }
        }
        write_attributes(&mut body, &mut pool, &self.attributes);

        let mut out = Vec::with_capacity(body.len() + pool.bytes.len() + 10);
        out.extend_from_slice(&MAGIC.to_be_bytes());
        put_u2(&mut out, 0);
        put_u2(&mut out, 61);
        put_u2(&mut out, pool.next);
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }

    /// Write `<root>/<internal name>.class`, creating package directories.
    pub fn write_to(&self, root: &Path) -> std::io::Result<PathBuf> {
        let path = root.join(format!("{}.class", self.this_class));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_bytes())?;
        Ok(path)
    }
}

struct PoolWriter {
    bytes: Vec<u8>,
    next: u16,
    interned: HashMap<Vec<u8>, u16>,
}

impl Default for PoolWriter {
    fn default() -> Self {
        PoolWriter {
            bytes: Vec::new(),
            next: 1,
            interned: HashMap::new(),
        }
    }
}

impl PoolWriter {
    fn intern(&mut self, entry: Vec<u8>) -> u16 {
        if let Some(&index) = self.interned.get(&entry) {
            return index;
        }
        let index = self.next;
        self.bytes.extend_from_slice(&entry);
        self.interned.insert(entry, index);
        self.next += 1;
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut entry = vec![CONSTANT_UTF8];
        put_u2(&mut entry, value.len() as u16);
        entry.extend_from_slice(value.as_bytes());
        self.intern(entry)
    }

    fn indexed(&mut self, tag: u8, indices: &[u16]) -> u16 {
        let mut entry = vec![tag];
        for &index in indices {
            put_u2(&mut entry, index);
        }
        self.intern(entry)
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        self.indexed(CONSTANT_CLASS, &[name])
    }

    fn string(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        self.indexed(CONSTANT_STRING, &[utf8])
    }

    fn integer(&mut self, value: i32) -> u16 {
        let mut entry = vec![CONSTANT_INTEGER];
        entry.extend_from_slice(&value.to_be_bytes());
        self.intern(entry)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.indexed(CONSTANT_NAME_AND_TYPE, &[name, descriptor])
    }

    fn member(&mut self, tag: u8, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.indexed(tag, &[class, nat])
    }
}

fn put_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_attributes(out: &mut Vec<u8>, pool: &mut PoolWriter, attributes: &[AttributeSpec]) {
    put_u2(out, attributes.len() as u16);
    for attribute in attributes {
        let (name, body) = encode_attribute(pool, attribute);
        put_u2(out, pool.utf8(&name));
        put_u4(out, body.len() as u32);
        out.extend_from_slice(&body);
    }
}

fn visibility(visible: bool, kind: &str) -> String {
    format!("Runtime{}{}", if visible { "Visible" } else { "Invisible" }, kind)
}

fn encode_attribute(pool: &mut PoolWriter, attribute: &AttributeSpec) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    let name = match attribute {
        AttributeSpec::Signature(signature) => {
            put_u2(&mut body, pool.utf8(signature));
            "Signature".to_string()
        }
        AttributeSpec::Exceptions(exceptions) => {
            put_u2(&mut body, exceptions.len() as u16);
            for exception in exceptions {
                put_u2(&mut body, pool.class(exception));
            }
            "Exceptions".to_string()
        }
        AttributeSpec::Annotations {
            visible,
            annotations,
        } => {
            encode_annotation_list(&mut body, pool, annotations);
            visibility(*visible, "Annotations")
        }
        AttributeSpec::ParameterAnnotations {
            visible,
            parameters,
        } => {
            body.push(parameters.len() as u8);
            for annotations in parameters {
                encode_annotation_list(&mut body, pool, annotations);
            }
            visibility(*visible, "ParameterAnnotations")
        }
        AttributeSpec::TypeAnnotations {
            visible,
            annotations,
        } => {
            put_u2(&mut body, annotations.len() as u16);
            for annotation in annotations {
                body.push(annotation.target_type);
                body.extend_from_slice(&annotation.target_info);
                body.push(annotation.type_path.len() as u8);
                for (kind, index) in &annotation.type_path {
                    body.push(*kind);
                    body.push(*index);
                }
                encode_annotation(&mut body, pool, &annotation.annotation);
            }
            visibility(*visible, "TypeAnnotations")
        }
        AttributeSpec::AnnotationDefault(value) => {
            encode_element(&mut body, pool, value);
            "AnnotationDefault".to_string()
        }
        AttributeSpec::Code(code) => {
            encode_code(&mut body, pool, code);
            "Code".to_string()
        }
        AttributeSpec::LocalVariables(variables) => {
            put_u2(&mut body, variables.len() as u16);
            for (slot, (name, descriptor)) in variables.iter().enumerate() {
                put_u2(&mut body, 0);
                put_u2(&mut body, 1);
                put_u2(&mut body, pool.utf8(name));
                put_u2(&mut body, pool.utf8(descriptor));
                put_u2(&mut body, slot as u16);
            }
            "LocalVariableTable".to_string()
        }
        AttributeSpec::Raw { name, bytes } => {
            body.extend_from_slice(bytes);
            name.clone()
        }
    };
    (name, body)
}

fn encode_annotation_list(out: &mut Vec<u8>, pool: &mut PoolWriter, annotations: &[AnnotationSpec]) {
    put_u2(out, annotations.len() as u16);
    for annotation in annotations {
        encode_annotation(out, pool, annotation);
    }
}

fn encode_annotation(out: &mut Vec<u8>, pool: &mut PoolWriter, annotation: &AnnotationSpec) {
    put_u2(out, pool.utf8(&annotation.descriptor));
    put_u2(out, annotation.elements.len() as u16);
    for (name, value) in &annotation.elements {
        put_u2(out, pool.utf8(name));
        encode_element(out, pool, value);
    }
}

fn encode_element(out: &mut Vec<u8>, pool: &mut PoolWriter, value: &ElementSpec) {
    match value {
        ElementSpec::Int(v) => {
            out.push(b'I');
            put_u2(out, pool.integer(*v));
        }
        ElementSpec::Str(s) => {
            out.push(b's');
            put_u2(out, pool.utf8(s));
        }
        ElementSpec::Enum { descriptor, name } => {
            out.push(b'e');
            put_u2(out, pool.utf8(descriptor));
            put_u2(out, pool.utf8(name));
        }
        ElementSpec::Class(descriptor) => {
            out.push(b'c');
            put_u2(out, pool.utf8(descriptor));
        }
        ElementSpec::Annotation(annotation) => {
            out.push(b'@');
            encode_annotation(out, pool, annotation);
        }
        ElementSpec::Array(values) => {
            out.push(b'[');
            put_u2(out, values.len() as u16);
            for value in values {
                encode_element(out, pool, value);
            }
        }
    }
}

fn encode_code(out: &mut Vec<u8>, pool: &mut PoolWriter, spec: &CodeSpec) {
    let mut code = Vec::new();
    for op in &spec.ops {
        encode_op(&mut code, pool, op);
    }

    put_u2(out, 8);
    put_u2(out, 8);
    put_u4(out, code.len() as u32);
    out.extend_from_slice(&code);

    put_u2(out, spec.handlers.len() as u16);
    for catch_type in &spec.handlers {
        put_u2(out, 0);
        put_u2(out, code.len() as u16);
        put_u2(out, 0);
        put_u2(out, catch_type.as_deref().map_or(0, |c| pool.class(c)));
    }
    write_attributes(out, pool, &spec.attributes);
}

fn pad_to_four(code: &mut Vec<u8>) {
    while code.len() % 4 != 0 {
        code.push(0);
    }
}

fn encode_op(code: &mut Vec<u8>, pool: &mut PoolWriter, op: &Op) {
    match op {
        Op::Type(opcode, class) => {
            code.push(*opcode);
            put_u2(code, pool.class(class));
        }
        Op::MultiANewArray(class, dimensions) => {
            code.push(opcodes::MULTIANEWARRAY);
            put_u2(code, pool.class(class));
            code.push(*dimensions);
        }
        Op::LdcClass(class) => {
            let index = pool.class(class);
            assert!(index <= u8::MAX as u16, "ldc operand out of range");
            code.push(opcodes::LDC);
            code.push(index as u8);
        }
        Op::LdcWClass(class) => {
            code.push(opcodes::LDC_W);
            put_u2(code, pool.class(class));
        }
        Op::LdcString(value) => {
            code.push(opcodes::LDC_W);
            put_u2(code, pool.string(value));
        }
        Op::Field {
            opcode,
            owner,
            name,
            descriptor,
        } => {
            code.push(*opcode);
            put_u2(code, pool.member(CONSTANT_FIELDREF, owner, name, descriptor));
        }
        Op::Invoke {
            opcode,
            owner,
            name,
            descriptor,
        } => {
            code.push(*opcode);
            if *opcode == opcodes::INVOKEINTERFACE {
                put_u2(code, pool.member(CONSTANT_INTERFACE_METHODREF, owner, name, descriptor));
                code.push(1);
                code.push(0);
            } else {
                put_u2(code, pool.member(CONSTANT_METHODREF, owner, name, descriptor));
            }
        }
        Op::InvokeDynamic { name, descriptor } => {
            let nat = pool.name_and_type(name, descriptor);
            let index = pool.indexed(CONSTANT_INVOKE_DYNAMIC, &[0, nat]);
            code.push(opcodes::INVOKEDYNAMIC);
            put_u2(code, index);
            put_u2(code, 0);
        }
        Op::TableSwitch { low, high } => {
            code.push(opcodes::TABLESWITCH);
            pad_to_four(code);
            code.extend_from_slice(&0i32.to_be_bytes());
            code.extend_from_slice(&low.to_be_bytes());
            code.extend_from_slice(&high.to_be_bytes());
            for _ in *low..=*high {
                code.extend_from_slice(&0i32.to_be_bytes());
            }
        }
        Op::LookupSwitch { keys } => {
            code.push(opcodes::LOOKUPSWITCH);
            pad_to_four(code);
            code.extend_from_slice(&0i32.to_be_bytes());
            code.extend_from_slice(&(keys.len() as i32).to_be_bytes());
            for key in keys {
                code.extend_from_slice(&key.to_be_bytes());
                code.extend_from_slice(&0i32.to_be_bytes());
            }
        }
        Op::WideIinc => {
            code.extend_from_slice(&[opcodes::WIDE, opcodes::IINC, 0x01, 0x00, 0x00, 0x01]);
        }
        Op::Raw(bytes) => code.extend_from_slice(bytes),
    }
}
