//! Declaration order for the bundle
//!
//! Produces the file sequence in which definitions must appear: a
//! post-order DFS over resolved dependencies, so everything a file needs
//! is declared before it. Cycles are warned about and broken, never fatal.

use phpack_core::Logger;
use phpack_store::{FileRecord, Store, StoreError};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

pub struct LoadOrderer {
    logger: Logger,
}

impl LoadOrderer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Order the transitive closure of the entry file so that for every
    /// resolved non-cyclic dependency A → B, B precedes A. Ties among
    /// independent files break by ascending file id.
    pub fn load_order(&self, store: &Store, entry_id: i64) -> Result<Vec<FileRecord>, StoreError> {
        let files = store.all_required_files(entry_id)?;
        let by_id: HashMap<i64, FileRecord> = files.into_iter().map(|f| (f.id, f)).collect();

        let mut adjacency: HashMap<i64, Vec<i64>> = HashMap::new();
        for &id in by_id.keys() {
            let mut targets: Vec<i64> = store
                .dependencies_of(id)?
                .into_iter()
                .filter(|d| d.is_resolved)
                .filter_map(|d| d.target_file_id)
                .filter(|t| *t != id && by_id.contains_key(t))
                .collect();
            targets.sort_unstable();
            targets.dedup();
            adjacency.insert(id, targets);
        }

        let mut roots: Vec<i64> = by_id.keys().copied().collect();
        roots.sort_unstable();
        // The entry drives the walk; remaining roots only mop up files a
        // cycle break may have left unvisited.
        if let Some(pos) = roots.iter().position(|&id| id == entry_id) {
            roots.remove(pos);
            roots.insert(0, entry_id);
        }

        let mut states: HashMap<i64, VisitState> = HashMap::new();
        let mut order: Vec<i64> = Vec::new();
        for root in roots {
            self.visit(root, &adjacency, &by_id, &mut states, &mut order);
        }

        Ok(order
            .into_iter()
            .filter_map(|id| by_id.get(&id).cloned())
            .collect())
    }

    fn visit(
        &self,
        id: i64,
        adjacency: &HashMap<i64, Vec<i64>>,
        by_id: &HashMap<i64, FileRecord>,
        states: &mut HashMap<i64, VisitState>,
        order: &mut Vec<i64>,
    ) {
        if states.contains_key(&id) {
            return;
        }
        states.insert(id, VisitState::InProgress);

        if let Some(targets) = adjacency.get(&id) {
            for &target in targets {
                match states.get(&target) {
                    Some(VisitState::InProgress) => {
                        let a = by_id.get(&id).map(|f| f.path.as_str()).unwrap_or("?");
                        let b = by_id.get(&target).map(|f| f.path.as_str()).unwrap_or("?");
                        self.logger
                            .warn(format!("Circular dependency between {} and {}", a, b));
                    }
                    Some(VisitState::Done) => {}
                    None => self.visit(target, adjacency, by_id, states, order),
                }
            }
        }

        states.insert(id, VisitState::Done);
        order.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phpack_core::logger::MemorySink;
    use phpack_core::LogLevel;
    use phpack_store::{DependencyKind, FileUpsert, NewDependency};
    use std::collections::HashSet as StdHashSet;
    use std::sync::Arc;

    fn file(store: &mut Store, path: &str) -> i64 {
        store.upsert_file(FileUpsert::new(path, "<?php")).unwrap()
    }

    fn link(store: &mut Store, from: i64, to: i64) {
        let dep = store
            .insert_dependency(NewDependency::symbol(from, DependencyKind::UseClass, "X", 1))
            .unwrap();
        store.resolve_dependency(dep, to).unwrap();
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let mut store = Store::in_memory().unwrap();
        let entry = file(&mut store, "main.php");
        let a = file(&mut store, "a.php");
        let b = file(&mut store, "b.php");
        link(&mut store, entry, a);
        link(&mut store, a, b);

        let orderer = LoadOrderer::new(Logger::null());
        let order: Vec<String> = orderer
            .load_order(&store, entry)
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();
        assert_eq!(order, vec!["b.php", "a.php", "main.php"]);
    }

    #[test]
    fn test_interface_before_implementation() {
        let mut store = Store::in_memory().unwrap();
        let entry = file(&mut store, "main.php");
        let class = file(&mut store, "src/Calc.php");
        let iface = file(&mut store, "src/I.php");
        link(&mut store, entry, class);
        link(&mut store, class, iface);

        let orderer = LoadOrderer::new(Logger::null());
        let order: Vec<String> = orderer
            .load_order(&store, entry)
            .unwrap()
            .into_iter()
            .map(|f| f.path)
            .collect();

        let iface_pos = order.iter().position(|p| p == "src/I.php").unwrap();
        let class_pos = order.iter().position(|p| p == "src/Calc.php").unwrap();
        assert!(iface_pos < class_pos);
    }

    #[test]
    fn test_cycle_warns_and_completes() {
        let sink = Arc::new(MemorySink::new());
        let mut store = Store::in_memory().unwrap();
        let a = file(&mut store, "a.php");
        let b = file(&mut store, "b.php");
        link(&mut store, a, b);
        link(&mut store, b, a);

        let orderer = LoadOrderer::new(Logger::new(sink.clone()));
        let order = orderer.load_order(&store, a).unwrap();

        assert_eq!(order.len(), 2);
        let unique: StdHashSet<i64> = order.iter().map(|f| f.id).collect();
        assert_eq!(unique.len(), 2);
        assert!(sink.contains(LogLevel::Warn, "Circular dependency"));
    }

    #[test]
    fn test_deterministic_tie_break() {
        let mut store = Store::in_memory().unwrap();
        let entry = file(&mut store, "main.php");
        let c = file(&mut store, "c.php");
        let b = file(&mut store, "b.php");
        link(&mut store, entry, c);
        link(&mut store, entry, b);

        let orderer = LoadOrderer::new(Logger::null());
        let order: Vec<i64> = orderer
            .load_order(&store, entry)
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        // Independent siblings come out in ascending file-id order.
        assert_eq!(order, vec![c, b, entry]);

        let again: Vec<i64> = orderer
            .load_order(&store, entry)
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(order, again);
    }
}
