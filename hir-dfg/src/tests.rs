use pretty_assertions::assert_eq;

use crate::{component, extract_cyclic, graph::Graph, vertex::VariableSubKind, DecompositionConfig};

fn config() -> DecompositionConfig {
    DecompositionConfig { verify: true }
}

fn init_logger() {
    let _ = env_logger::Builder::from_env("MIDENC_TRACE")
        .format_timestamp(None)
        .is_test(true)
        .try_init();
}

#[test]
fn split_separates_disjoint_components() {
    let mut g = Graph::new("top", ());

    let a = g.add_variable(VariableSubKind::Packed, "a", None);
    let op_a = g.add_operator(1);
    let b = g.add_variable(VariableSubKind::Packed, "b", None);
    g.connect(a, op_a, 0);
    g.connect(op_a, b, 0);

    let c = g.add_variable(VariableSubKind::Packed, "c", None);
    let op_c = g.add_operator(1);
    let d = g.add_variable(VariableSubKind::Packed, "d", None);
    g.connect(c, op_c, 0);
    g.connect(op_c, d, 0);

    let components = component::split(&mut g, "");
    assert_eq!(components.len(), 2);
    assert!(g.is_empty());
    for comp in &components {
        assert_eq!(comp.size(), 3);
    }
}

#[test]
fn split_drops_unreachable_dead_code() {
    let mut g = Graph::new("top", ());

    let a = g.add_variable(VariableSubKind::Packed, "a", None);
    let op = g.add_operator(1);
    g.connect(a, op, 0);
    // `op`'s result is never read by anything, so it is dead and has no
    // variable to anchor it; but it is still reachable from `a`, so it
    // survives as part of `a`'s component rather than being dropped.
    // A truly unreachable vertex is one no variable's traversal ever visits:
    let _unreachable_const = g.add_constant();

    let components = component::split(&mut g, "");
    // the constant is never visited by any variable-seeded DFS and is
    // dropped as dead code; only `a`'s component survives.
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].size(), 2);
    assert!(g.is_empty());
}

#[test]
fn split_names_components_with_label() {
    let mut g = Graph::new("mod1", ());
    g.add_variable(VariableSubKind::Packed, "a", None);

    let components = component::split(&mut g, "clocked");
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].name(), "mod1-clocked-component-0");
}

#[test]
fn extract_cyclic_returns_empty_for_acyclic_graph() {
    init_logger();
    let mut g = Graph::new("top", ());
    let a = g.add_variable(VariableSubKind::Packed, "a", None);
    let op = g.add_operator(1);
    let b = g.add_variable(VariableSubKind::Packed, "b", None);
    g.connect(a, op, 0);
    g.connect(op, b, 0);

    let before = g.size();
    let components = extract_cyclic(&mut g, "", &config()).expect("acyclic graph never fails verification");
    assert!(components.is_empty());
    assert_eq!(g.size(), before, "acyclic graph must be left untouched");
}

#[test]
fn extract_cyclic_isolates_a_combinational_loop() {
    init_logger();
    let mut g = Graph::new("top", ());

    // `latch`'s driver also reads `latch` through a combinational feedback
    // operator: a one-variable, one-operator cycle.
    let latch = g.add_variable(VariableSubKind::Packed, "latch", None);
    let feedback = g.add_operator(1);
    g.connect(latch, feedback, 0);
    g.connect(feedback, latch, 0);

    // plus an unrelated, purely acyclic piece that must stay behind.
    let x = g.add_variable(VariableSubKind::Packed, "x", None);
    let op_x = g.add_operator(1);
    let y = g.add_variable(VariableSubKind::Packed, "y", None);
    g.connect(x, op_x, 0);
    g.connect(op_x, y, 0);

    let before = g.size();
    let components = extract_cyclic(&mut g, "loop", &config()).expect("verification must pass");
    assert_eq!(components.len(), 1, "exactly one non-trivial SCC");

    let cyclic = &components[0];
    // the feedback operator always migrates; `latch` is cloned at the cut,
    // so one copy stays in the residual graph and one travels with the loop.
    assert!(cyclic.size() >= 2);
    assert_eq!(cyclic.name(), "top-loop-component-0");

    // acyclic logic (`x`, `op_x`, `y`) stays behind in the residual graph.
    assert!(g.size() < before);
}

#[test]
fn extract_cyclic_ignores_isolated_variables() {
    init_logger();
    let mut g = Graph::new("top", ());
    // a variable with no driver and no readers participates in no SCC.
    g.add_variable(VariableSubKind::Packed, "unused", None);

    let components = extract_cyclic(&mut g, "", &config()).expect("no cycles to find");
    assert!(components.is_empty());
    assert_eq!(g.size(), 1);
}

#[test]
fn two_variable_cycle_through_two_operators_is_non_trivial() {
    init_logger();
    let mut g = Graph::new("top", ());

    let a = g.add_variable(VariableSubKind::Packed, "a", None);
    let op1 = g.add_operator(1);
    let b = g.add_variable(VariableSubKind::Packed, "b", None);
    let op2 = g.add_operator(1);

    // a -> op1 -> b -> op2 -> a
    g.connect(a, op1, 0);
    g.connect(op1, b, 0);
    g.connect(b, op2, 0);
    g.connect(op2, a, 0);

    let components = extract_cyclic(&mut g, "", &config()).expect("verification must pass");
    assert_eq!(components.len(), 1);
    // both operators and (clones of) both variables must have migrated.
    assert!(components[0].size() >= 4);
}

#[test]
fn variable_shared_between_cycle_and_external_use_gets_cloned_at_the_cut() {
    init_logger();
    let mut g = Graph::new("top", ());

    let shared = g.add_variable(VariableSubKind::Packed, "shared", None);
    let op_a = g.add_operator(1);
    let op_b = g.add_operator(1);
    let out = g.add_variable(VariableSubKind::Packed, "out", None);

    // the cycle: shared -> op_a -> shared
    g.connect(shared, op_a, 0);
    g.connect(op_a, shared, 0);
    // the external fan-out: shared -> op_b -> out
    g.connect(shared, op_b, 0);
    g.connect(op_b, out, 0);

    let components = extract_cyclic(&mut g, "", &config()).expect("verification must pass");
    assert_eq!(components.len(), 1, "shared and op_a form one non-trivial SCC");
    assert_eq!(components[0].size(), 2, "only the cycle itself migrates");

    // `op_b` and `out` stay behind, plus a clone of `shared` created at the
    // cut to keep driving `op_b` from the residual side.
    assert_eq!(g.size(), 3, "op_b, out, and a clone of shared remain");
}
