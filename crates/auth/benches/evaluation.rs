use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use deptguard_auth::{
    Action, Department, EvaluationRequest, PermissionRule, PolicyEvaluator, PolicyRegistry,
    Principal, Role, Status, explain_decision,
};
use deptguard_core::PrincipalId;

fn principal(id: &str, role: Role, department: Department) -> Principal {
    Principal::new(PrincipalId::parse(id).unwrap(), role, department)
}

/// Forty scoped department-head rules ahead of the granting one: worst-case scan.
fn long_table() -> PolicyRegistry {
    let mut rules: Vec<PermissionRule> = (0..40)
        .map(|_| {
            PermissionRule::new([Role::DepartmentHead], [Action::Update])
                .targeting_roles([Role::Admin])
                .targeting_same_department()
        })
        .collect();
    rules.push(
        PermissionRule::new([Role::DepartmentHead], [Action::Update])
            .targeting_roles([Role::General])
            .targeting_same_department(),
    );
    PolicyRegistry::from_rules(rules).unwrap()
}

fn bench_evaluation(c: &mut Criterion) {
    let builtin = PolicyEvaluator::new(Arc::new(PolicyRegistry::builtin()));
    let long = PolicyEvaluator::new(Arc::new(long_table()));

    let head = principal("h1", Role::DepartmentHead, Department::Hr);
    let staff = principal("g1", Role::General, Department::Hr).with_status(Status::Inactive);

    let update = EvaluationRequest::new(&head, Action::Update).with_target(&staff);
    let reactivate = EvaluationRequest::new(&head, Action::ChangeStatus)
        .with_target(&staff)
        .with_proposed_status(Status::Active);

    c.bench_function("builtin_update", |b| {
        b.iter(|| builtin.evaluate(black_box(&update)))
    });
    c.bench_function("builtin_change_status", |b| {
        b.iter(|| builtin.evaluate(black_box(&reactivate)))
    });
    c.bench_function("long_table_last_rule", |b| {
        b.iter(|| long.evaluate(black_box(&update)))
    });
    c.bench_function("explain_long_table", |b| {
        b.iter(|| explain_decision(&long, black_box(&update)))
    });
}

criterion_group!(benches, bench_evaluation);
criterion_main!(benches);
