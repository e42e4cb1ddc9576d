//! Graph-store write and lookup operations.
//!
//! Every write here is an idempotent, parameterized MERGE scoped by project.
//! No cross-call transaction is assumed: a partial multi-step failure leaves
//! the graph in a state the next full scan converges out of.

pub mod entities;
pub mod files;
pub mod projects;
pub mod versions;

/// Derived unique key for a project-scoped node.
pub(crate) fn node_key(project: &str, parts: &[&str]) -> String {
    let mut key = String::from(project);
    for part in parts {
        key.push('|');
        key.push_str(part);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_key_is_stable() {
        assert_eq!(node_key("demo", &["src/a.ts"]), "demo|src/a.ts");
        assert_eq!(
            node_key("demo", &["Function", "src/a.ts", "foo"]),
            "demo|Function|src/a.ts|foo"
        );
    }
}
