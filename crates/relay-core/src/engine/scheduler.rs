//! Ordenación de las acciones de un stage en olas por run-order.
//!
//! La dependencia dentro de un stage es exclusivamente el run-order (gating
//! grueso): no se infiere un grafo fino por artifacts. Empates dentro de
//! una ola conservan el orden de declaración, sólo para logging
//! determinista; la ejecución real de la ola es concurrente.

use crate::model::ActionSpec;

/// Agrupa las acciones en olas: mismo run-order = misma ola; las olas se
/// devuelven en orden ascendente. Un stage vacío produce cero olas y es
/// trivialmente exitoso.
pub fn order(actions: &[ActionSpec]) -> Vec<Vec<&ActionSpec>> {
    let mut run_orders: Vec<u32> = actions.iter().map(|a| a.run_order).collect();
    run_orders.sort_unstable();
    run_orders.dedup();

    run_orders.into_iter()
              .map(|wave| actions.iter().filter(|a| a.run_order == wave).collect())
              .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActionSpec;

    #[test]
    fn empty_stage_yields_no_waves() {
        assert!(order(&[]).is_empty());
    }

    #[test]
    fn groups_by_run_order_ascending() {
        let actions = vec![ActionSpec::build("apply").run_order(4),
                           ActionSpec::approval("review").run_order(1),
                           ActionSpec::build("plan").run_order(2),
                           ActionSpec::approval("plan-review").run_order(3)];
        let waves = order(&actions);
        let names: Vec<Vec<&str>> = waves.iter()
                                         .map(|w| w.iter().map(|a| a.name.as_str()).collect())
                                         .collect();
        assert_eq!(names, vec![vec!["review"], vec!["plan"], vec!["plan-review"], vec!["apply"]]);
    }

    #[test]
    fn ties_keep_declaration_order() {
        let actions = vec![ActionSpec::build("b").run_order(2),
                           ActionSpec::build("a").run_order(2),
                           ActionSpec::build("z").run_order(1)];
        let waves = order(&actions);
        assert_eq!(waves.len(), 2);
        let second: Vec<&str> = waves[1].iter().map(|a| a.name.as_str()).collect();
        assert_eq!(second, vec!["b", "a"]);
    }
}
