// src/sema/block.rs
//! Lexical-scope analysis state: function blocks, branch sub-blocks, and
//! per-variable metadata.
//!
//! Variables are function-scoped; sub-blocks exist only to merge the types
//! branches assign. The assigned-var stack is shared by every sub-block in
//! the chunk, with each sub-block remembering where its slice starts.

use crate::frontend::ast::NodeId;
use crate::identity::{BlockId, LocalVarId, NameId, SubBlockId, SymId};
use crate::sema::types::Type;
use rustc_hash::FxHashMap;

/// What a local-variable slot stands for. Exactly one of these holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalVarKind {
    /// A plain stack local
    Local,
    /// A local in an inner function referring to an enclosing function's
    /// local, shared through a box
    Captured { parent: LocalVarId },
    /// The name refers to a chunk-level symbol, not a stack local
    StaticAlias { sym: SymId },
}

#[derive(Debug)]
pub struct LocalVar {
    pub name: NameId,
    /// Current inferred type as traversal proceeds
    pub vtype: Type,
    pub kind: LocalVarKind,
    pub is_param: bool,
    pub is_boxed: bool,
    /// Declared with an explicit `capture` or `static` modifier
    pub has_capture_or_static_modifier: bool,
    /// Once true, stays true: the var held an rc value at some point and
    /// codegen must release it on death
    pub lifetime_rc_candidate: bool,
    /// Declared inside a nested sub-block; codegen must emit an implicit
    /// initializer at the block head
    pub gen_initializer: bool,
    pub gen_is_defined: bool,
    /// Register slot, filled by the downstream code generator
    pub register: Option<u32>,
    /// Sub-block the var was created in, for first-write detection
    pub decl_sub_block: SubBlockId,
}

impl LocalVar {
    pub fn is_captured(&self) -> bool {
        matches!(self.kind, LocalVarKind::Captured { .. })
    }

    pub fn is_static_alias(&self) -> bool {
        matches!(self.kind, LocalVarKind::StaticAlias { .. })
    }

    pub fn static_sym(&self) -> Option<SymId> {
        match self.kind {
            LocalVarKind::StaticAlias { sym } => Some(sym),
            _ => None,
        }
    }
}

/// Per-function analysis block (the chunk's top level is a block too)
#[derive(Debug)]
pub struct Block {
    /// Function params, with captured vars appended at the end
    pub params: Vec<LocalVarId>,
    /// Non-param vars in declaration order
    pub locals: Vec<LocalVarId>,
    /// Transient name map, only valid while this block is being analyzed
    pub name_to_var: FxHashMap<NameId, LocalVarId>,
    pub first_sub_block: SubBlockId,
    pub sub_block_depth: u32,
    /// Owning func decl; None for the chunk's main block
    pub func_decl: Option<NodeId>,
    pub ret_type: Type,
    pub has_ret_type: bool,
    pub infer_ret_type: bool,
    /// Static functions may not capture enclosing locals
    pub is_static_func_block: bool,
}

#[derive(Debug)]
pub struct SubBlock {
    /// Index into the shared assigned-var stack where this sub-block's
    /// entries begin
    pub assigned_var_start: usize,
    /// Type snapshot taken on the first assignment to an outer var inside
    /// this sub-block; dropped on close
    pub prev_var_types: FxHashMap<LocalVarId, Type>,
    /// For iter sub-blocks: the type each touched var must be initialized
    /// to when the generator emits the loop prologue
    pub iter_var_begin_types: Vec<(LocalVarId, Type)>,
    pub prev_sub_block: Option<SubBlockId>,
    pub is_iter: bool,
}

/// The full lexical state of one chunk under analysis
#[derive(Debug, Default)]
pub struct BlockState {
    pub vars: Vec<LocalVar>,
    pub blocks: Vec<Block>,
    pub sub_blocks: Vec<SubBlock>,
    block_stack: Vec<BlockId>,
    cur_sub_block: Option<SubBlockId>,
    assigned_vars: Vec<LocalVarId>,
}

impl BlockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(&self, id: LocalVarId) -> &LocalVar {
        &self.vars[id.index() as usize]
    }

    pub fn var_mut(&mut self, id: LocalVarId) -> &mut LocalVar {
        &mut self.vars[id.index() as usize]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index() as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index() as usize]
    }

    pub fn sub_block(&self, id: SubBlockId) -> &SubBlock {
        &self.sub_blocks[id.index() as usize]
    }

    pub fn cur_block_id(&self) -> BlockId {
        *self.block_stack.last().expect("no block pushed")
    }

    pub fn cur_block(&self) -> &Block {
        self.block(self.cur_block_id())
    }

    pub fn cur_block_mut(&mut self) -> &mut Block {
        let id = self.cur_block_id();
        self.block_mut(id)
    }

    /// Block stack depth; 1 while analyzing the chunk's top level
    pub fn block_depth(&self) -> usize {
        self.block_stack.len()
    }

    pub fn cur_sub_block_id(&self) -> SubBlockId {
        self.cur_sub_block.expect("no sub-block pushed")
    }

    /// The block one level up from the current one, if any
    pub fn parent_block_id(&self) -> Option<BlockId> {
        let len = self.block_stack.len();
        if len < 2 {
            return None;
        }
        Some(self.block_stack[len - 2])
    }

    pub fn push_block(&mut self, func_decl: Option<NodeId>, is_static_func_block: bool) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(Block {
            params: Vec::new(),
            locals: Vec::new(),
            name_to_var: FxHashMap::default(),
            first_sub_block: SubBlockId::new(self.sub_blocks.len() as u32),
            sub_block_depth: 0,
            func_decl,
            ret_type: Type::Undefined,
            has_ret_type: false,
            infer_ret_type: false,
            is_static_func_block,
        });
        self.block_stack.push(id);
        self.push_sub_block(false);
        id
    }

    pub fn push_sub_block(&mut self, is_iter: bool) {
        let id = SubBlockId::new(self.sub_blocks.len() as u32);
        self.sub_blocks.push(SubBlock {
            assigned_var_start: self.assigned_vars.len(),
            prev_var_types: FxHashMap::default(),
            iter_var_begin_types: Vec::new(),
            prev_sub_block: self.cur_sub_block,
            is_iter,
        });
        self.cur_block_mut().sub_block_depth += 1;
        self.cur_sub_block = Some(id);
    }

    /// Allocate a local in the current block and bind its name.
    pub fn add_var(
        &mut self,
        name: NameId,
        vtype: Type,
        kind: LocalVarKind,
        is_param: bool,
    ) -> LocalVarId {
        let id = LocalVarId::new(self.vars.len() as u32);
        let decl_sub_block = self.cur_sub_block_id();
        self.vars.push(LocalVar {
            name,
            vtype,
            kind,
            is_param,
            is_boxed: matches!(kind, LocalVarKind::Captured { .. }),
            has_capture_or_static_modifier: false,
            lifetime_rc_candidate: vtype.rc_candidate(),
            gen_initializer: false,
            gen_is_defined: false,
            register: None,
            decl_sub_block,
        });
        let block = self.cur_block_mut();
        if is_param {
            block.params.push(id);
        } else {
            block.locals.push(id);
        }
        block.name_to_var.insert(name, id);
        id
    }

    pub fn lookup_var(&self, name: NameId) -> Option<LocalVarId> {
        self.cur_block().name_to_var.get(&name).copied()
    }

    pub fn lookup_var_in(&self, block: BlockId, name: NameId) -> Option<LocalVarId> {
        self.block(block).name_to_var.get(&name).copied()
    }

    /// Record an assignment to `var` of a value of `rhs_type`.
    ///
    /// Boxes captured vars on first write, snapshots the pre-branch type on
    /// the first write inside the current sub-block, lowers the stored type,
    /// and pushes the var onto the assigned stack for the closing merge.
    pub fn assign_var(&mut self, var: LocalVarId, rhs_type: Type) {
        let sb_id = self.cur_sub_block_id();
        let v = self.var_mut(var);
        if v.is_captured() && !v.is_boxed {
            v.is_boxed = true;
        }
        let prev = v.vtype;
        let created_here = v.decl_sub_block == sb_id;
        let stored = rhs_type.to_local_type();
        v.vtype = stored;
        if rhs_type.rc_candidate() {
            v.lifetime_rc_candidate = true;
        }

        let sb = &mut self.sub_blocks[sb_id.index() as usize];
        let first_write_here = !created_here && !sb.prev_var_types.contains_key(&var);
        if first_write_here {
            sb.prev_var_types.insert(var, prev);
            self.assigned_vars.push(var);
        } else if created_here && prev.tag() == crate::sema::types::TypeTag::Undefined {
            // Creation-time write: the var joins this sub-block's assigned
            // set exactly once
            self.assigned_vars.push(var);
        }
    }

    /// Close the current sub-block, merging branch-assigned var types into
    /// the parent level.
    pub fn end_sub_block(&mut self) {
        let sb_id = self.cur_sub_block_id();
        let start = self.sub_blocks[sb_id.index() as usize].assigned_var_start;
        let assigned: Vec<LocalVarId> = self.assigned_vars.split_off(start);

        if self.sub_blocks[sb_id.index() as usize].is_iter {
            // Record the pre-loop initialization type for every touched var
            // before the merge rewrites anything.
            let mut begin_types = Vec::with_capacity(assigned.len());
            for &var in &assigned {
                let snapshot = self.sub_blocks[sb_id.index() as usize]
                    .prev_var_types
                    .get(&var)
                    .copied();
                let cur = self.var(var).vtype;
                match snapshot {
                    Some(prev) if prev != cur => begin_types.push((var, Type::Any)),
                    _ => begin_types.push((var, cur)),
                }
            }
            self.sub_blocks[sb_id.index() as usize].iter_var_begin_types = begin_types;
        }

        let depth = self.cur_block().sub_block_depth;
        let parent = self.sub_blocks[sb_id.index() as usize].prev_sub_block;
        if depth > 1 {
            let parent_id = parent.expect("nested sub-block without parent");
            for var in assigned {
                let snapshot = self.sub_blocks[sb_id.index() as usize]
                    .prev_var_types
                    .get(&var)
                    .copied();
                match snapshot {
                    Some(prev) => {
                        if prev != self.var(var).vtype {
                            self.demote_var(var);
                        }
                        if !self.sub_blocks[parent_id.index() as usize]
                            .prev_var_types
                            .contains_key(&var)
                        {
                            self.assigned_vars.push(var);
                        }
                    }
                    None => {
                        // First-ever assignment relative to the parent;
                        // propagate so outer merges see it
                        self.assigned_vars.push(var);
                    }
                }
            }
        }

        let sb = &mut self.sub_blocks[sb_id.index() as usize];
        sb.prev_var_types = FxHashMap::default();
        self.cur_sub_block = sb.prev_sub_block;
        self.cur_block_mut().sub_block_depth -= 1;
    }

    fn demote_var(&mut self, var: LocalVarId) {
        let v = self.var_mut(var);
        v.vtype = Type::Any;
        v.lifetime_rc_candidate = true;
    }

    /// Close the current block. The caller has already handled return-type
    /// bookkeeping and capture checks.
    pub fn end_block(&mut self) {
        self.end_sub_block();
        let id = self.cur_block_id();
        self.block_mut(id).name_to_var = FxHashMap::default();
        self.block_stack.pop();
    }

    /// Captured vars of a block, in param order
    pub fn captured_params(&self, block: BlockId) -> impl Iterator<Item = LocalVarId> + '_ {
        self.block(block)
            .params
            .iter()
            .copied()
            .filter(|&v| self.var(v).is_captured())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(i: u32) -> NameId {
        NameId::new(i)
    }

    #[test]
    fn branch_reassignment_with_new_type_demotes_to_any() {
        let mut state = BlockState::new();
        state.push_block(None, false);

        let x = state.add_var(name(0), Type::Undefined, LocalVarKind::Local, false);
        state.assign_var(x, Type::number());
        assert_eq!(state.var(x).vtype, Type::number());

        // if branch assigns a string
        state.push_sub_block(false);
        state.assign_var(x, Type::StaticString);
        state.end_sub_block();

        assert_eq!(state.var(x).vtype, Type::Any);
        assert!(state.var(x).lifetime_rc_candidate);
    }

    #[test]
    fn branch_reassignment_with_same_type_keeps_it() {
        let mut state = BlockState::new();
        state.push_block(None, false);

        let x = state.add_var(name(0), Type::Undefined, LocalVarKind::Local, false);
        state.assign_var(x, Type::number());

        state.push_sub_block(false);
        state.assign_var(x, Type::number());
        state.end_sub_block();

        assert_eq!(state.var(x).vtype, Type::number());
        assert!(!state.var(x).lifetime_rc_candidate);
    }

    #[test]
    fn var_created_in_branch_propagates_to_parent_merge() {
        let mut state = BlockState::new();
        state.push_block(None, false);

        // Outer assignment so the nested branch is not depth 1
        state.push_sub_block(false);
        let y = state.add_var(name(1), Type::Undefined, LocalVarKind::Local, false);
        state.assign_var(y, Type::StaticString);
        state.push_sub_block(false);
        state.assign_var(y, Type::number());
        state.end_sub_block();

        // Inner branch re-assigned with a different type: any
        assert_eq!(state.var(y).vtype, Type::Any);
        state.end_sub_block();
    }

    #[test]
    fn iter_sub_block_records_begin_types() {
        let mut state = BlockState::new();
        state.push_block(None, false);

        let x = state.add_var(name(0), Type::Undefined, LocalVarKind::Local, false);
        state.assign_var(x, Type::number());

        state.push_sub_block(true);
        let sb = state.cur_sub_block_id();
        state.assign_var(x, Type::StaticString);
        state.end_sub_block();

        // Type changed across the loop body: init to none/any at loop head
        assert_eq!(state.sub_block(sb).iter_var_begin_types, vec![(x, Type::Any)]);

        state.push_sub_block(true);
        let sb2 = state.cur_sub_block_id();
        state.assign_var(x, Type::Any);
        state.end_sub_block();
        assert_eq!(
            state.sub_block(sb2).iter_var_begin_types,
            vec![(x, Type::Any)]
        );
    }

    #[test]
    fn captured_var_boxes_on_assignment() {
        let mut state = BlockState::new();
        state.push_block(None, false);
        let outer = state.add_var(name(0), Type::number(), LocalVarKind::Local, false);

        state.push_block(None, false);
        let cap = state.add_var(
            name(0),
            Type::number(),
            LocalVarKind::Captured { parent: outer },
            true,
        );
        assert!(state.var(cap).is_boxed);
        state.assign_var(cap, Type::number());
        assert!(state.var(cap).is_boxed);
    }
}
