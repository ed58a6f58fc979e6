use std::collections::HashMap;

use arcstr::ArcStr;
use diagnostics::LogSink;
use geometry::{Point, Rect, Transformation};
use indexmap::IndexMap;
use netir::{DeviceAbstract, Netlist};
use rust_decimal::Decimal;
use test_log::test;

use crate::builder::{BuildNetHierarchy, NetBuilder, NetBuilderConfig};
use crate::devices::{DeviceCellView, DeviceExtractor, RawDevice, RawTerminal};
use crate::io::{create_from_file, AnyDb};
use crate::layout::{CellId, Instance, LayerId, Layout, Text};
use crate::log::LogEntry;
use crate::lvs::{CrossReference, LayoutVsSchematic, NetlistComparer};
use crate::netlist::{ExtractionState, LayoutToNetlist, NetJoinRule};
use crate::pattern::GlobPattern;
use crate::Error;

fn insert(l2n: &LayoutToNetlist, cell: CellId, layer: LayerId, rect: Rect) {
    let store = l2n.dss().unwrap();
    store.write().unwrap().insert_shape(cell, layer, rect);
}

fn label(l2n: &LayoutToNetlist, cell: CellId, layer: LayerId, text: &str, at: Point) {
    let store = l2n.dss().unwrap();
    store
        .write()
        .unwrap()
        .insert_text(cell, layer, Text::new(text, at));
}

/// A single-cell engine with one connected metal layer and one label
/// layer.
fn single_cell() -> (LayoutToNetlist, CellId, LayerId, LayerId) {
    let mut layout = Layout::new(0.001);
    let top = layout.add_cell("top");
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let metal = l2n.make_layer(Some("metal1")).unwrap();
    let labels = l2n.make_layer(Some("metal1_label")).unwrap();
    l2n.connect_layer(metal);
    l2n.connect(metal, labels);
    (l2n, top, metal, labels)
}

#[test]
fn two_touching_squares_make_one_net() {
    let (mut l2n, top, metal, _) = single_cell();
    insert(&l2n, top, metal, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, metal, Rect::from_sides(10, 0, 20, 10));
    l2n.extract_netlist().unwrap();

    let netlist = l2n.netlist().unwrap();
    assert_eq!(netlist.len(), 1);
    let (circuit_id, circuit) = netlist.circuits().next().unwrap();
    assert_eq!(circuit.num_nets(), 1);
    let (net_id, _) = circuit.nets().next().unwrap();
    assert_eq!(l2n.shapes_of_net(circuit_id, net_id).len(), 2);
    assert_eq!(l2n.state(), ExtractionState::NetlistExtracted);
}

#[test]
fn labels_name_nets() {
    let (mut l2n, top, metal, labels) = single_cell();
    insert(&l2n, top, metal, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, metal, Rect::from_sides(100, 0, 110, 10));
    label(&l2n, top, labels, "out", Point::new(5, 5));
    l2n.extract_netlist().unwrap();

    let circuit = l2n.netlist().unwrap().circuit(
        l2n.circuit_of_cell(top).unwrap(),
    );
    assert_eq!(circuit.num_nets(), 2);
    assert!(circuit.net_by_display_name("out").is_some());
}

#[test]
fn cross_boundary_connection_creates_pin_and_binding() {
    let mut layout = Layout::new(0.001);
    let child = layout.add_cell("child");
    let top = layout.add_cell("top");
    layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let metal = l2n.make_layer(Some("metal1")).unwrap();
    l2n.connect_layer(metal);
    insert(&l2n, child, metal, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, metal, Rect::from_sides(10, 0, 30, 10));
    l2n.extract_netlist().unwrap();

    let netlist = l2n.netlist().unwrap();
    let child_circuit = netlist.circuit(l2n.circuit_of_cell(child).unwrap());
    let top_circuit = netlist.circuit(l2n.circuit_of_cell(top).unwrap());
    assert_eq!(child_circuit.pins().count(), 1);
    let (pin_id, pin) = child_circuit.pins().next().unwrap();
    assert!(pin.net().is_some());
    assert_eq!(top_circuit.num_subcircuits(), 1);
    let (_, sc) = top_circuit.subcircuits().next().unwrap();
    assert_eq!(sc.connection(pin_id), Some(top_circuit.nets().next().unwrap().0));
}

#[test]
fn floating_subcircuits_are_dropped_by_default() {
    let mut layout = Layout::new(0.001);
    let child = layout.add_cell("child");
    let top = layout.add_cell("top");
    layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
    layout.add_instance(
        top,
        Instance::new(child, "c2", Transformation::translate(Point::new(1000, 0))),
    );
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let metal = l2n.make_layer(Some("metal1")).unwrap();
    l2n.connect_layer(metal);
    insert(&l2n, child, metal, Rect::from_sides(0, 0, 10, 10));
    l2n.extract_netlist().unwrap();

    let netlist = l2n.netlist().unwrap();
    let top_circuit = netlist.circuit(l2n.circuit_of_cell(top).unwrap());
    assert_eq!(top_circuit.num_subcircuits(), 0);
    // The child circuit definition survives.
    let child_circuit = netlist.circuit(l2n.circuit_of_cell(child).unwrap());
    assert_eq!(child_circuit.num_nets(), 1);

    l2n.set_include_floating_subcircuits(true);
    l2n.extract_netlist().unwrap();
    let netlist = l2n.netlist().unwrap();
    let top_circuit = netlist.circuit(l2n.circuit_of_cell(top).unwrap());
    assert_eq!(top_circuit.num_subcircuits(), 2);
}

#[test]
fn global_nets_connect_across_the_hierarchy() {
    let mut layout = Layout::new(0.001);
    let child = layout.add_cell("child");
    let top = layout.add_cell("top");
    layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let well = l2n.make_layer(Some("nwell")).unwrap();
    let g1 = l2n.connect_global(well, "bulk").unwrap();
    let g2 = l2n.connect_global(well, "bulk").unwrap();
    assert_eq!(g1, g2);
    insert(&l2n, child, well, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, well, Rect::from_sides(1000, 0, 1010, 10));
    l2n.extract_netlist().unwrap();

    let netlist = l2n.netlist().unwrap();
    let top_circuit = netlist.circuit(l2n.circuit_of_cell(top).unwrap());
    assert_eq!(top_circuit.num_nets(), 1);
    assert!(top_circuit.net_by_display_name("bulk").is_some());
    let child_circuit = netlist.circuit(l2n.circuit_of_cell(child).unwrap());
    assert_eq!(child_circuit.pins().count(), 1);
}

#[test]
fn join_rules_chain_transitively() {
    let (mut l2n, top, metal, labels) = single_cell();
    insert(&l2n, top, metal, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, metal, Rect::from_sides(100, 0, 110, 10));
    insert(&l2n, top, metal, Rect::from_sides(200, 0, 210, 10));
    label(&l2n, top, labels, "vdd_a", Point::new(5, 5));
    label(&l2n, top, labels, "vdd_b", Point::new(105, 5));
    label(&l2n, top, labels, "vss", Point::new(205, 5));
    l2n.add_join_rule(NetJoinRule::Glob(GlobPattern::new("vdd*")));
    l2n.add_join_rule(NetJoinRule::NameSet(vec![
        ArcStr::from("vdd_a"),
        ArcStr::from("vss"),
    ]));
    l2n.extract_netlist().unwrap();

    let circuit = l2n
        .netlist()
        .unwrap()
        .circuit(l2n.circuit_of_cell(top).unwrap());
    // Glob joins the vdds; the surviving net then joins vss by name.
    assert_eq!(circuit.num_nets(), 1);
    let (net_id, net) = circuit.nets().next().unwrap();
    assert_eq!(net.name().map(|n| n.as_str()), Some("vdd_a"));
    assert_eq!(net.clusters().len(), 3);
    assert_eq!(l2n.shapes_of_net(l2n.circuit_of_cell(top).unwrap(), net_id).len(), 3);
}

#[test]
fn connect_after_extraction_invalidates_the_netlist() {
    let (mut l2n, top, metal, _) = single_cell();
    insert(&l2n, top, metal, Rect::from_sides(0, 0, 10, 10));
    l2n.extract_netlist().unwrap();
    assert!(l2n.is_netlist_extracted());

    let poly = l2n.make_layer(Some("poly")).unwrap();
    l2n.connect(metal, poly);
    assert_eq!(l2n.state(), ExtractionState::ConnectivityDeclared);
    assert!(l2n.clusters().is_none());
    let netlist = l2n.netlist().unwrap();
    assert!(netlist.circuits().all(|(_, c)| c.num_nets() == 0));

    l2n.extract_netlist().unwrap();
    assert!(l2n.is_netlist_extracted());
}

#[test]
fn probe_finds_the_topmost_net() {
    let mut layout = Layout::new(0.001);
    let child = layout.add_cell("child");
    let top = layout.add_cell("top");
    layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let metal = l2n.make_layer(Some("metal1")).unwrap();
    l2n.connect_layer(metal);
    // Connected across the boundary, plus a floating child-only shape.
    insert(&l2n, child, metal, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, child, metal, Rect::from_sides(500, 0, 510, 10));
    insert(&l2n, top, metal, Rect::from_sides(10, 0, 30, 10));
    l2n.extract_netlist().unwrap();

    // A point on the connected net resolves at the top.
    let hit = l2n.probe_net(metal, Point::new(5, 5)).unwrap();
    assert_eq!(Some(hit.circuit), l2n.circuit_of_cell(top));
    assert!(hit.path.is_empty());

    // A point on the floating child shape resolves inside the child.
    let hit = l2n.probe_net(metal, Point::new(505, 5)).unwrap();
    assert_eq!(Some(hit.circuit), l2n.circuit_of_cell(child));
    assert_eq!(hit.path, vec![ArcStr::from("c1")]);

    assert!(l2n.probe_net(metal, Point::new(-100, -100)).is_none());
    let um = l2n.probe_net_um(metal, (0.005, 0.005)).unwrap();
    assert_eq!(Some(um.circuit), l2n.circuit_of_cell(top));
}

#[test]
fn antenna_check_reports_ratio_violations() {
    let mut layout = Layout::new(0.001);
    let top = layout.add_cell("top");
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let gate = l2n.make_layer(Some("gate")).unwrap();
    let metal = l2n.make_layer(Some("metal1")).unwrap();
    let diode = l2n.make_layer(Some("diode")).unwrap();
    l2n.connect_layer(gate);
    l2n.connect_layer(metal);
    l2n.connect(gate, metal);
    l2n.connect(metal, diode);
    // Gate 10x10 = 100, collector 10x50 = 500, ratio 5.
    insert(&l2n, top, gate, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, metal, Rect::from_sides(10, 0, 60, 10));
    // A second cluster with no gate at all.
    insert(&l2n, top, metal, Rect::from_sides(0, 1000, 10, 1010));
    l2n.extract_netlist().unwrap();

    let violations = l2n.antenna_check(gate, 1.0, 0.0, metal, 1.0, 0.0, 4.0, &[]);
    assert_eq!(violations.len(), 1);
    assert!((violations[0].ratio - 5.0).abs() < 1e-9);
    assert_eq!(violations[0].shapes.len(), 1);

    // Ratio 5 passes a limit of 6.
    assert!(l2n
        .antenna_check(gate, 1.0, 0.0, metal, 1.0, 0.0, 6.0, &[])
        .is_empty());

    // A diode on the net raises the limit by area / divisor.
    insert(&l2n, top, diode, Rect::from_sides(60, 0, 70, 10));
    l2n.extract_netlist().unwrap();
    let relieved = l2n.antenna_check(gate, 1.0, 0.0, metal, 1.0, 0.0, 4.0, &[(diode, 100.0)]);
    assert!(relieved.is_empty());
    let still = l2n.antenna_check(gate, 1.0, 0.0, metal, 1.0, 0.0, 4.0, &[(diode, 200.0)]);
    assert_eq!(still.len(), 1);
    assert!((still[0].limit - 4.5).abs() < 1e-9);
    // A zero-divisor diode grants full relief.
    assert!(l2n
        .antenna_check(gate, 1.0, 0.0, metal, 1.0, 0.0, 0.1, &[(diode, 0.0)])
        .is_empty());
}

/// Recognizes every rectangle on the body layer as a two-terminal
/// resistor with terminals on the contact layer.
struct ResistorExtractor;

impl DeviceExtractor for ResistorExtractor {
    fn name(&self) -> &str {
        "resistor"
    }

    fn layer_roles(&self) -> &[&'static str] {
        &["body", "contact"]
    }

    fn extract(
        &mut self,
        cell: DeviceCellView<'_>,
        layers: &IndexMap<ArcStr, LayerId>,
        log: &mut dyn LogSink<LogEntry>,
    ) -> Vec<RawDevice> {
        let body = layers["body"];
        let contact = layers["contact"];
        let mut out = Vec::new();
        for (i, shape) in cell.shapes_on(body).iter().enumerate() {
            let Some(rect) = shape.geo.rect() else {
                log.append(
                    LogEntry::warning("non-rectangular resistor body skipped")
                        .with_cell(cell.cell())
                        .with_geometry(shape.geo.clone()),
                );
                continue;
            };
            let mut params = IndexMap::new();
            params.insert(ArcStr::from("L"), Decimal::from(rect.width()));
            out.push(RawDevice {
                name: arcstr::format!("r{}", i + 1),
                class: arcstr::literal!("RES"),
                params,
                terminals: vec![
                    RawTerminal {
                        role: arcstr::literal!("A"),
                        layer: contact,
                        shape: Rect::from_sides(rect.left(), rect.bot(), rect.left() + 1, rect.top())
                            .into(),
                    },
                    RawTerminal {
                        role: arcstr::literal!("B"),
                        layer: contact,
                        shape: Rect::from_sides(rect.right() - 1, rect.bot(), rect.right(), rect.top())
                            .into(),
                    },
                ],
                abstracts: vec![DeviceAbstract {
                    layer: body.raw(),
                    shape: shape.geo.clone(),
                }],
            });
        }
        out
    }
}

fn resistor_roles(body: LayerId, contact: LayerId) -> IndexMap<ArcStr, LayerId> {
    let mut roles = IndexMap::new();
    roles.insert(ArcStr::from("body"), body);
    roles.insert(ArcStr::from("contact"), contact);
    roles
}

#[test]
fn device_terminals_bind_to_clusters() {
    let mut layout = Layout::new(0.001);
    let top = layout.add_cell("top");
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let body = l2n.make_layer(Some("res_body")).unwrap();
    let contact = l2n.make_layer(Some("contact")).unwrap();
    insert(&l2n, top, contact, Rect::from_sides(0, 0, 2, 10));
    insert(&l2n, top, contact, Rect::from_sides(18, 0, 20, 10));
    insert(&l2n, top, body, Rect::from_sides(0, 0, 20, 10));

    let mut incomplete = IndexMap::new();
    incomplete.insert(ArcStr::from("body"), body);
    assert!(matches!(
        l2n.extract_devices(&mut ResistorExtractor, &incomplete),
        Err(Error::InvalidArgument(_))
    ));

    l2n.extract_devices(&mut ResistorExtractor, &resistor_roles(body, contact))
        .unwrap();
    l2n.connect_layer(contact);
    l2n.extract_netlist().unwrap();
    l2n.check_extraction_errors().unwrap();

    let circuit = l2n
        .netlist()
        .unwrap()
        .circuit(l2n.circuit_of_cell(top).unwrap());
    assert_eq!(circuit.devices().count(), 1);
    let (_, device) = circuit.devices().next().unwrap();
    assert_eq!(device.class().as_str(), "RES");
    assert_eq!(device.param("L"), Some(Decimal::from(20)));
    let a = device.terminal("A").unwrap();
    let b = device.terminal("B").unwrap();
    assert_ne!(a, b);
}

#[test]
fn unresolved_terminals_are_logged_as_errors() {
    let mut layout = Layout::new(0.001);
    let top = layout.add_cell("top");
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let body = l2n.make_layer(Some("res_body")).unwrap();
    let contact = l2n.make_layer(Some("contact")).unwrap();
    // Only one contact pad; terminal B has nothing to bind to.
    insert(&l2n, top, contact, Rect::from_sides(0, 0, 2, 10));
    insert(&l2n, top, body, Rect::from_sides(0, 0, 20, 10));

    l2n.extract_devices(&mut ResistorExtractor, &resistor_roles(body, contact))
        .unwrap();
    l2n.connect_layer(contact);
    l2n.extract_netlist().unwrap();

    assert!(l2n.log().has_error());
    assert!(matches!(
        l2n.check_extraction_errors(),
        Err(Error::Extraction(_))
    ));
    // The unresolved terminal still got a (floating) net.
    let circuit = l2n
        .netlist()
        .unwrap()
        .circuit(l2n.circuit_of_cell(top).unwrap());
    let (_, device) = circuit.devices().next().unwrap();
    assert!(device.terminal("B").is_some());
    assert_ne!(device.terminal("A"), device.terminal("B"));
}

#[test]
fn net_builder_flatten_and_disconnected() {
    let (mut l2n, top, metal, labels) = single_cell();
    insert(&l2n, top, metal, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, metal, Rect::from_sides(10, 0, 20, 10));
    label(&l2n, top, labels, "out", Point::new(5, 5));
    l2n.extract_netlist().unwrap();
    let circuit_id = l2n.circuit_of_cell(top).unwrap();
    let net_id = l2n
        .netlist()
        .unwrap()
        .circuit(circuit_id)
        .net_by_display_name("out")
        .unwrap();

    let mut target = Layout::new(0.001);
    let target_cell = target.add_cell("nets");
    let target_metal = target.alloc_layer();
    let cmap = HashMap::from([(circuit_id, target_cell)]);
    let lmap = HashMap::from([(metal, target_metal)]);

    let mut builder = NetBuilder::new(
        &l2n,
        &mut target,
        &cmap,
        &lmap,
        NetBuilderConfig {
            hierarchy: BuildNetHierarchy::Flatten,
            net_prop_key: Some(ArcStr::from("net")),
            ..Default::default()
        },
    );
    builder.build_net(circuit_id, net_id).unwrap();
    drop(builder);
    let shapes = target.cell(target_cell).shapes_on(target_metal);
    assert_eq!(shapes.len(), 2);
    assert!(shapes
        .iter()
        .all(|s| s.property == Some((ArcStr::from("net"), ArcStr::from("out")))));

    let mut target = Layout::new(0.001);
    let target_cell = target.add_cell("nets");
    let target_metal = target.alloc_layer();
    let cmap = HashMap::from([(circuit_id, target_cell)]);
    let lmap = HashMap::from([(metal, target_metal)]);
    let mut builder = NetBuilder::new(
        &l2n,
        &mut target,
        &cmap,
        &lmap,
        NetBuilderConfig {
            hierarchy: BuildNetHierarchy::Disconnected,
            ..Default::default()
        },
    );
    builder.build_net(circuit_id, net_id).unwrap();
    drop(builder);
    assert_eq!(target.cell(target_cell).instances().len(), 1);
    let net_cell = target.try_cell_id_named("NET_out").unwrap();
    assert_eq!(target.cell(net_cell).shapes_on(target_metal).len(), 2);
}

#[test]
fn net_builder_subcircuit_cells_reuse_subcells() {
    let mut layout = Layout::new(0.001);
    let child = layout.add_cell("child");
    let top = layout.add_cell("top");
    layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
    layout.set_top(top);
    let mut l2n = LayoutToNetlist::new(layout);
    let metal = l2n.make_layer(Some("metal1")).unwrap();
    l2n.connect_layer(metal);
    insert(&l2n, child, metal, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, metal, Rect::from_sides(10, 0, 30, 10));
    l2n.extract_netlist().unwrap();
    let circuit_id = l2n.circuit_of_cell(top).unwrap();
    let net_id = l2n
        .netlist()
        .unwrap()
        .circuit(circuit_id)
        .nets()
        .next()
        .unwrap()
        .0;

    let mut target = Layout::new(0.001);
    let target_cell = target.add_cell("nets");
    let target_metal = target.alloc_layer();
    let cmap = HashMap::from([(circuit_id, target_cell)]);
    let lmap = HashMap::from([(metal, target_metal)]);
    let mut builder = NetBuilder::new(
        &l2n,
        &mut target,
        &cmap,
        &lmap,
        NetBuilderConfig::default(),
    );
    builder.build_net(circuit_id, net_id).unwrap();
    drop(builder);

    // One local shape in the target cell, the child part in a generated
    // subcell.
    assert_eq!(target.cell(target_cell).shapes_on(target_metal).len(), 1);
    assert_eq!(target.cell(target_cell).instances().len(), 1);
    let subcell = target.cell(target_cell).instances()[0].child();
    assert_eq!(target.cell(subcell).shapes_on(target_metal).len(), 1);
}

#[test]
fn save_load_round_trip_preserves_the_database() {
    let (mut l2n, top, metal, labels) = single_cell();
    insert(&l2n, top, metal, Rect::from_sides(0, 0, 10, 10));
    insert(&l2n, top, metal, Rect::from_sides(10, 0, 20, 10));
    label(&l2n, top, labels, "out", Point::new(5, 5));
    l2n.add_join_rule(NetJoinRule::Glob(GlobPattern::new("v*")));
    l2n.set_description("round trip test");
    l2n.extract_netlist().unwrap();
    l2n.log_entry(LogEntry::warning("synthetic entry").with_cell(top));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.l2n.json");
    l2n.save(&path, false).unwrap();
    let loaded = LayoutToNetlist::load(&path).unwrap();

    assert_eq!(loaded.connectivity(), l2n.connectivity());
    assert_eq!(loaded.log(), l2n.log());
    assert_eq!(loaded.clusters(), l2n.clusters());
    assert_eq!(loaded.join_rules(), l2n.join_rules());
    assert_eq!(loaded.state(), l2n.state());
    assert_eq!(loaded.description().as_str(), "round trip test");
    assert_eq!(summarize(loaded.netlist().unwrap()), summarize(l2n.netlist().unwrap()));

    // Geometry queries work on the loaded database.
    let hit = loaded.probe_net(metal, Point::new(5, 5)).unwrap();
    let circuit = loaded.netlist().unwrap().circuit(hit.circuit);
    assert_eq!(circuit.net_display_name(hit.net).as_str(), "out");

    // The compact format round-trips identically.
    let short = dir.path().join("db.short.json");
    l2n.save(&short, true).unwrap();
    let loaded = LayoutToNetlist::load(&short).unwrap();
    assert_eq!(loaded.connectivity(), l2n.connectivity());
}

fn summarize(netlist: &Netlist) -> Vec<(String, usize, Vec<String>)> {
    netlist
        .circuits()
        .map(|(id, c)| {
            let mut nets: Vec<String> = c
                .nets()
                .map(|(net, _)| c.net_display_name(net).to_string())
                .collect();
            nets.sort();
            (format!("{}:{}", id, c.name()), c.num_nets(), nets)
        })
        .collect()
}

/// A comparer that matches when both netlists have the same circuit
/// count.
struct CountComparer;

impl NetlistComparer for CountComparer {
    fn compare(&self, extracted: &Netlist, reference: &Netlist) -> CrossReference {
        CrossReference {
            matched: extracted.len() == reference.len(),
            circuits: Vec::new(),
        }
    }
}

#[test]
fn lvs_compare_and_persistence() {
    let mut layout = Layout::new(0.001);
    let top = layout.add_cell("top");
    layout.set_top(top);
    let mut lvs = LayoutVsSchematic::new(layout);
    let metal = lvs.make_layer(Some("metal1")).unwrap();
    lvs.connect_layer(metal);
    insert(&lvs, top, metal, Rect::from_sides(0, 0, 10, 10));
    lvs.extract_netlist().unwrap();

    assert!(matches!(
        lvs.compare(&CountComparer),
        Err(Error::InvalidArgument(_))
    ));
    let reference = lvs.netlist().unwrap().clone();
    lvs.set_reference(reference);
    assert!(lvs.compare(&CountComparer).unwrap());
    assert!(lvs.xref().unwrap().matched);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.lvs.json");
    lvs.save(&path, false).unwrap();

    // The kind tag routes loading.
    assert!(matches!(
        LayoutToNetlist::load(&path),
        Err(Error::UnknownFormat(_))
    ));
    match create_from_file(&path).unwrap() {
        AnyDb::Lvs(loaded) => {
            assert!(loaded.reference().is_some());
            assert!(loaded.xref().unwrap().matched);
        }
        AnyDb::L2n(_) => panic!("expected an LVS database"),
    }
}

#[test]
fn extraction_is_deterministic_across_thread_counts() {
    fn build(threads: usize) -> LayoutToNetlist {
        let mut layout = Layout::new(0.001);
        let child = layout.add_cell("child");
        let top = layout.add_cell("top");
        layout.add_instance(top, Instance::new(child, "c1", Transformation::identity()));
        layout.add_instance(
            top,
            Instance::new(child, "c2", Transformation::translate(Point::new(40, 0))),
        );
        layout.set_top(top);
        let mut l2n = LayoutToNetlist::new(layout);
        let metal = l2n.make_layer(Some("metal1")).unwrap();
        l2n.connect_layer(metal);
        insert(&l2n, child, metal, Rect::from_sides(0, 0, 10, 10));
        insert(&l2n, top, metal, Rect::from_sides(10, 0, 40, 10));
        insert(&l2n, top, metal, Rect::from_sides(0, 100, 10, 110));
        l2n.set_threads(threads).unwrap();
        l2n.extract_netlist().unwrap();
        l2n
    }

    let one = build(1);
    let two = build(2);
    assert_eq!(one.clusters(), two.clusters());
    assert_eq!(
        summarize(one.netlist().unwrap()),
        summarize(two.netlist().unwrap())
    );
}
