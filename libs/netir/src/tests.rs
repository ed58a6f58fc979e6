use geometry::Transformation;
use rust_decimal_macros::dec;

use crate::*;

fn circuit_with_three_nets() -> (Circuit, NetId, NetId, NetId) {
    let mut circuit = Circuit::new("top");
    let a = circuit.add_net(Net::new());
    let b = circuit.add_net(Net::new());
    let c = circuit.add_net(Net::new());
    circuit.net_mut(a).set_name("a");
    circuit.net_mut(b).set_name("b");
    circuit.net_mut(c).set_name("c");
    (circuit, a, b, c)
}

#[test]
fn merge_nets_reattaches_terminals() {
    let (mut circuit, a, b, _) = circuit_with_three_nets();

    let mut dev = Device::new("m1", "NMOS");
    dev.connect_terminal("G", b);
    dev.connect_terminal("S", a);
    dev.set_param("W", dec!(0.42));
    let dev = circuit.add_device(dev);

    let pin = circuit.add_pin(Pin::new("b", b));

    circuit.merge_nets(a, b);
    assert_eq!(circuit.device(dev).terminal("G"), Some(a));
    assert_eq!(circuit.device(dev).terminal("S"), Some(a));
    assert_eq!(circuit.pin(pin).net(), Some(a));
    assert_eq!(circuit.num_nets(), 2);
}

#[test]
fn merge_nets_is_transitive() {
    let (mut circuit, a, b, c) = circuit_with_three_nets();
    let mut dev = Device::new("m1", "NMOS");
    dev.connect_terminal("D", c);
    let dev = circuit.add_device(dev);

    // {a, b} then {b, c}: everything ends up on a.
    circuit.merge_nets(a, b);
    circuit.merge_nets(a, c);
    assert_eq!(circuit.num_nets(), 1);
    assert_eq!(circuit.device(dev).terminal("D"), Some(a));
}

#[test]
fn merge_survivor_adopts_name_when_unnamed() {
    let mut circuit = Circuit::new("top");
    let a = circuit.add_net(Net::new());
    let b = circuit.add_net(Net::new());
    circuit.net_mut(b).set_name("vdd");
    circuit.merge_nets(a, b);
    assert_eq!(circuit.net(a).name().map(|n| n.as_str()), Some("vdd"));
}

#[test]
fn clear_connectivity_keeps_devices() {
    let (mut circuit, a, _, _) = circuit_with_three_nets();
    let mut dev = Device::new("m1", "NMOS");
    dev.connect_terminal("S", a);
    let dev = circuit.add_device(dev);
    circuit.add_pin(Pin::new("a", a));

    circuit.clear_connectivity();
    assert_eq!(circuit.num_nets(), 0);
    assert_eq!(circuit.pins().count(), 0);
    assert_eq!(circuit.device(dev).terminals().count(), 0);
    assert_eq!(circuit.device(dev).class(), "NMOS");
}

#[test]
fn display_names() {
    let mut netlist = Netlist::new();
    let mut circuit = Circuit::new("child");
    let n = circuit.add_net(Net::new());
    assert_eq!(circuit.net_display_name(n), "$1");
    circuit.net_mut(n).set_name("out");
    assert_eq!(circuit.net_display_name(n), "out");
    let id = netlist.add_circuit(circuit);
    assert_eq!(netlist.try_circuit_id_named("child"), Some(id));
    assert!(netlist.try_circuit_named("nope").is_none());
}

#[test]
fn subcircuit_bindings() {
    let mut netlist = Netlist::new();
    let mut child = Circuit::new("child");
    let cn = child.add_net(Net::new());
    let cp = child.add_pin(Pin::new("p", cn));
    let child_id = netlist.add_circuit(child);

    let mut top = Circuit::new("top");
    let tn = top.add_net(Net::new());
    let sc = top.add_subcircuit(SubCircuit::new(
        child_id,
        "x1",
        Transformation::identity(),
    ));
    top.subcircuit_mut(sc).connect(cp, tn);
    let top_id = netlist.add_circuit(top);
    netlist.set_top(top_id);

    let (_, sub) = netlist.circuit(top_id).subcircuits().next().unwrap();
    assert_eq!(sub.child(), child_id);
    assert_eq!(sub.connection(cp), Some(tn));
    assert_eq!(netlist.top_circuit(), Some(top_id));
}
