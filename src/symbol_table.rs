//! Symbol table: a stack of lexical scopes over a process-wide `uid`
//! sequence.
//!
//! The `uid` counter is modeled as a field threaded explicitly through the
//! compilation context (here: a field on `SymbolTable`, which the parser
//! owns and re-creates per function) rather than a global singleton.

use crate::error::CompileError;
use crate::types::DataType;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct VarData {
    pub uid: usize,
    pub data_type: DataType,
}

pub struct SymbolTable {
    scopes: Vec<HashMap<String, usize>>,
    variables: Vec<VarData>,
    next_uid: usize,
}

impl SymbolTable {
    /// Create a fresh table seeded with a shared `uid` counter so that
    /// emitted variable names never collide across functions.
    pub fn new(next_uid: usize) -> Self {
        SymbolTable {
            scopes: vec![HashMap::new()],
            variables: Vec::new(),
            next_uid,
        }
    }

    /// The `uid` counter value to seed the next function's table with.
    pub fn next_uid(&self) -> usize {
        self.next_uid
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the outermost scope");
        self.scopes.pop();
    }

    /// True iff more than one scope is active, i.e. we are nested below
    /// the function's top level.
    pub fn inside_nested_scope(&self) -> bool {
        self.scopes.len() > 1
    }

    fn has_in_current_scope(&self, name: &str) -> bool {
        self.scopes.last().unwrap().contains_key(name)
    }

    /// Register `name` in the current scope with `data_type`, returning its
    /// freshly assigned `uid`. Fails if `name` is already bound in the
    /// *current* scope (shadowing an outer scope is fine).
    pub fn init_var(
        &mut self,
        name: &str,
        data_type: DataType,
        line: usize,
    ) -> Result<usize, CompileError> {
        if self.has_in_current_scope(name) {
            return Err(CompileError::scope(
                line,
                format!("variable '{name}' already declared in this scope"),
            ));
        }
        let uid = self.next_uid;
        self.next_uid += 1;
        self.scopes.last_mut().unwrap().insert(name.to_string(), uid);
        self.variables.push(VarData { uid, data_type });
        Ok(uid)
    }

    /// Resolve `name` to its nearest binding, searching from the innermost
    /// scope outward.
    pub fn lookup(&self, name: &str, line: usize) -> Result<VarData, CompileError> {
        for scope in self.scopes.iter().rev() {
            if let Some(&uid) = scope.get(name) {
                let data_type = self
                    .variables
                    .iter()
                    .find(|v| v.uid == uid)
                    .map(|v| v.data_type)
                    .expect("uid registered in scope but missing from variables");
                return Ok(VarData { uid, data_type });
            }
        }
        Err(CompileError::scope(line, format!("undefined variable '{name}'")))
    }
}
