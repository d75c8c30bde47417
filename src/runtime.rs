// src/runtime.rs
//! The VM collaborator: registries the runtime shares with sema.
//!
//! Sema talks to the runtime through the narrow ensure/set surface below so
//! that tag types, tag literals, object types, field symbols, and runtime
//! func/var symbol slots get stable ids the code generator can embed.

use crate::identity::{
    FieldSymId, FuncSymSlotId, NameId, ObjectTypeId, ResolvedFuncSigId, ResolvedSymId, TagLitSymId,
    TagTypeId, VarSymSlotId,
};
use rustc_hash::FxHashMap;

/// An opaque runtime value (NaN-boxed in the VM); sema only stores and
/// retains these, never inspects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value(pub u64);

/// Native function entry point
pub type NativeFn = fn(&mut [Value]) -> Value;

#[derive(Debug)]
pub struct TagType {
    pub name: NameId,
    pub members: Vec<(TagLitSymId, u32)>,
}

#[derive(Debug)]
pub struct ObjectType {
    pub parent: Option<ResolvedSymId>,
    pub name: NameId,
    pub fields: Vec<(FieldSymId, u32)>,
}

/// A runtime function-symbol slot written by sema for native functions
#[derive(Debug, Clone, Copy)]
pub struct FuncSymEntry {
    pub native: NativeFn,
    pub is_typed: bool,
    pub arity: u32,
    pub r_sig: ResolvedFuncSigId,
}

/// Registries shared with the VM. One instance per compilation.
#[derive(Debug, Default)]
pub struct RuntimeIndex {
    tag_types: Vec<TagType>,
    tag_type_by_name: FxHashMap<NameId, TagTypeId>,
    tag_lit_syms: Vec<NameId>,
    tag_lit_by_name: FxHashMap<NameId, TagLitSymId>,
    object_types: Vec<ObjectType>,
    object_by_key: FxHashMap<(Option<ResolvedSymId>, NameId), ObjectTypeId>,
    field_syms: Vec<NameId>,
    field_by_name: FxHashMap<NameId, FieldSymId>,
    func_syms: Vec<Option<FuncSymEntry>>,
    func_by_key: FxHashMap<(Option<ResolvedSymId>, NameId, ResolvedFuncSigId), FuncSymSlotId>,
    var_syms: Vec<Option<Value>>,
    var_by_key: FxHashMap<(Option<ResolvedSymId>, NameId), VarSymSlotId>,
    /// Values retained on behalf of module variables for the life of the
    /// compilation
    retained: Vec<Value>,
}

impl RuntimeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_tag_type(&mut self, name: NameId) -> TagTypeId {
        if let Some(&id) = self.tag_type_by_name.get(&name) {
            return id;
        }
        let id = TagTypeId(self.tag_types.len() as u8);
        self.tag_type_by_name.insert(name, id);
        self.tag_types.push(TagType {
            name,
            members: Vec::new(),
        });
        id
    }

    pub fn tag_type(&self, id: TagTypeId) -> &TagType {
        &self.tag_types[id.0 as usize]
    }

    pub fn ensure_tag_lit_sym(&mut self, name: NameId) -> TagLitSymId {
        if let Some(&id) = self.tag_lit_by_name.get(&name) {
            return id;
        }
        let id = TagLitSymId::new(self.tag_lit_syms.len() as u32);
        self.tag_lit_by_name.insert(name, id);
        self.tag_lit_syms.push(name);
        id
    }

    pub fn set_tag_lit_sym(&mut self, tag_type: TagTypeId, lit: TagLitSymId, ordinal: u32) {
        self.tag_types[tag_type.0 as usize].members.push((lit, ordinal));
    }

    pub fn ensure_object_type(
        &mut self,
        parent: Option<ResolvedSymId>,
        name: NameId,
    ) -> ObjectTypeId {
        if let Some(&id) = self.object_by_key.get(&(parent, name)) {
            return id;
        }
        let id = ObjectTypeId::new(self.object_types.len() as u32);
        self.object_by_key.insert((parent, name), id);
        self.object_types.push(ObjectType {
            parent,
            name,
            fields: Vec::new(),
        });
        id
    }

    pub fn object_type(&self, id: ObjectTypeId) -> &ObjectType {
        &self.object_types[id.index() as usize]
    }

    pub fn ensure_field_sym(&mut self, name: NameId) -> FieldSymId {
        if let Some(&id) = self.field_by_name.get(&name) {
            return id;
        }
        let id = FieldSymId::new(self.field_syms.len() as u32);
        self.field_by_name.insert(name, id);
        self.field_syms.push(name);
        id
    }

    pub fn add_field_sym(&mut self, object: ObjectTypeId, field: FieldSymId, index: u32) {
        self.object_types[object.index() as usize]
            .fields
            .push((field, index));
    }

    pub fn ensure_func_sym(
        &mut self,
        parent: Option<ResolvedSymId>,
        name: NameId,
        r_sig: ResolvedFuncSigId,
    ) -> FuncSymSlotId {
        if let Some(&id) = self.func_by_key.get(&(parent, name, r_sig)) {
            return id;
        }
        let id = FuncSymSlotId::new(self.func_syms.len() as u32);
        self.func_by_key.insert((parent, name, r_sig), id);
        self.func_syms.push(None);
        id
    }

    pub fn set_func_sym(&mut self, slot: FuncSymSlotId, entry: FuncSymEntry) {
        self.func_syms[slot.index() as usize] = Some(entry);
    }

    pub fn func_sym(&self, slot: FuncSymSlotId) -> Option<&FuncSymEntry> {
        self.func_syms[slot.index() as usize].as_ref()
    }

    pub fn ensure_var_sym(&mut self, parent: Option<ResolvedSymId>, name: NameId) -> VarSymSlotId {
        if let Some(&id) = self.var_by_key.get(&(parent, name)) {
            return id;
        }
        let id = VarSymSlotId::new(self.var_syms.len() as u32);
        self.var_by_key.insert((parent, name), id);
        self.var_syms.push(None);
        id
    }

    pub fn set_var_sym(&mut self, slot: VarSymSlotId, value: Value) {
        self.var_syms[slot.index() as usize] = Some(value);
    }

    pub fn retain(&mut self, value: Value) {
        self.retained.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_types_intern_by_name() {
        let mut rt = RuntimeIndex::new();
        let color = NameId::new(0);
        let a = rt.ensure_tag_type(color);
        let b = rt.ensure_tag_type(color);
        assert_eq!(a, b);

        let red = rt.ensure_tag_lit_sym(NameId::new(1));
        rt.set_tag_lit_sym(a, red, 0);
        assert_eq!(rt.tag_type(a).members, vec![(red, 0)]);
    }

    #[test]
    fn field_indices_accumulate_in_order() {
        let mut rt = RuntimeIndex::new();
        let obj = rt.ensure_object_type(None, NameId::new(0));
        let x = rt.ensure_field_sym(NameId::new(1));
        let y = rt.ensure_field_sym(NameId::new(2));
        rt.add_field_sym(obj, x, 0);
        rt.add_field_sym(obj, y, 1);
        assert_eq!(rt.object_type(obj).fields, vec![(x, 0), (y, 1)]);
    }
}
