/// End-to-end checks of register values through the public API and the math opcodes
use segvm::compare::CompareContext;
use segvm::config::EngineConfig;
use segvm::opcodes_math::MathOp;
use segvm::segment::SegmentKind;
use segvm::{make_reg, CallSite, Machine, NoWorkarounds, Operation, RegError, VmError, TRUE_REG};
use test_log::test;

#[test]
fn test_small_addition() {
    assert_eq!(make_reg(0, 5).add(make_reg(0, 3)), Ok(make_reg(0, 8)));
}

#[test]
fn test_addition_wraps() {
    assert_eq!(make_reg(0, 0xFFFF).add(make_reg(0, 1)), Ok(make_reg(0, 0)));
}

#[test]
fn test_pointer_subtraction_within_segment() {
    assert_eq!(make_reg(7, 100).sub(make_reg(7, 40)), Ok(make_reg(0, 60)));
}

#[test]
fn test_null_checks() {
    assert!(make_reg(0, 0).is_null());
    assert!(!make_reg(0, 1).is_null());
    assert!(!make_reg(3, 0).is_null());
}

#[test]
fn test_uninitialized_check() {
    assert!(!make_reg(0xFFFF, 0xFFFF).is_initialized());
    for segment in [0x0000u16, 0x0001, 0x00FF, 0x8000, 0xFFFE] {
        assert!(make_reg(segment, 0xFFFF).is_initialized());
    }
}

#[test]
fn test_number_pointer_comparison_needs_workaround() {
    let site = CallSite::new("test", 1, 1, "", "");
    let ctx = CompareContext::new(&NoWorkarounds, &site);
    let result = make_reg(0, 5).lt(make_reg(3, 5), &ctx);
    assert!(matches!(
        result,
        Err(RegError::UnresolvedWorkaround {
            operation: Operation::Comparison,
            ..
        })
    ));
}

#[test]
fn test_configured_machine_runs_opcodes() {
    let config = EngineConfig::from_toml_str(
        r#"
        game_id = "qfg1vga"
        stack_size = 16
        legacy_pointer_comparison = true

        [[workaround]]
        game_id = "qfg1vga"
        room = 301
        script = 928
        object = "Blink"
        method = "init"
        operation = "division"
        fake = 0
        "#,
    )
    .unwrap();

    let mut machine = Machine::from_config(&config);
    let script = machine.heap.allocate_with(SegmentKind::Script, 32).unwrap();
    let clones = machine.heap.allocate(SegmentKind::Clones).unwrap();
    machine.site = CallSite::new("qfg1vga", 301, 928, "Blink", "init");

    // Dividing by an object that sneaked in as the second parameter
    machine.push(make_reg(0, 10)).unwrap();
    machine.acc = make_reg(clones, 0);
    machine.execute_math_opcode(0x08).unwrap();
    assert_eq!(machine.acc, make_reg(0, 0));

    // An object compared with a small resource number orders above it
    machine.push(make_reg(clones, 0)).unwrap();
    machine.acc = make_reg(0, 7);
    machine.execute_math_op(MathOp::Gt).unwrap();
    assert_eq!(machine.acc, TRUE_REG);

    // Walking a script-relative pointer
    machine.push(make_reg(script, 4)).unwrap();
    machine.acc = make_reg(0, 6);
    machine.execute_math_op(MathOp::Add).unwrap();
    assert_eq!(machine.acc, make_reg(script, 10));
    assert!(machine.heap.contains(machine.acc));

    // No workaround registered for multiplication
    machine.push(make_reg(clones, 0)).unwrap();
    machine.acc = make_reg(0, 2);
    assert!(matches!(
        machine.execute_math_op(MathOp::Mul),
        Err(VmError::Reg(RegError::ArithmeticType {
            operation: Operation::Multiplication,
            ..
        }))
    ));
}
