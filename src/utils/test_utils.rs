use crate::model::{Point, Transform, Tree};

/// `(branch_id, parent_point_id, [(point_id, [x, y, z])])`
pub type BranchDef<'a> = (&'a str, &'a str, Vec<(&'a str, [f64; 3])>);

/// Builds a tree from a root location and branch definitions, added in order.
pub fn build_tree(transform: Transform, root: [f64; 3], branches: Vec<BranchDef>) -> Tree {
    let mut tree = Tree::new(transform).expect("valid transform");
    tree.set_root(Point::new("root", root[0], root[1], root[2]))
        .expect("root");
    for (branch_id, parent, points) in branches {
        let b = tree.add_branch(branch_id, parent).expect("branch");
        for (id, [x, y, z]) in points {
            tree.add_point(b, Point::new(id, x, y, z)).expect("point");
        }
    }
    tree
}

/// Root "soma" at (0,0,1) and one branch "b" through (k,k,1), k = 1..=5.
pub fn straight_branch_tree() -> Tree {
    let mut tree = Tree::default();
    tree.set_root(Point::new("soma", 0.0, 0.0, 1.0)).unwrap();
    let b = tree.add_branch("b", "soma").unwrap();
    for k in 1..=5 {
        let c = k as f64;
        tree.add_point(b, Point::new(format!("p{}", k), c, c, 1.0))
            .unwrap();
    }
    tree
}

/// Four branches:
/// - `b0` runs from the root along +y to (0,10,0)
/// - `b1` (length 1) and `b2` (length 4) both leave `b0_2` at (0,2,0)
/// - `b3` (length 1) leaves `b2_2`; `b2_3` is annotated "axon"
pub fn order_fixture() -> Tree {
    let b0: Vec<(String, [f64; 3])> = (1..=10)
        .map(|k| (format!("b0_{}", k), [0.0, k as f64, 0.0]))
        .collect();
    let mut tree = Tree::default();
    tree.set_root(Point::new("root", 0.0, 0.0, 0.0)).unwrap();
    let shaft = tree.add_branch("b0", "root").unwrap();
    for (id, [x, y, z]) in b0 {
        tree.add_point(shaft, Point::new(id, x, y, z)).unwrap();
    }
    let b1 = tree.add_branch("b1", "b0_2").unwrap();
    tree.add_point(b1, Point::new("b1_1", 1.0, 2.0, 0.0)).unwrap();
    let b2 = tree.add_branch("b2", "b0_2").unwrap();
    for k in 1..=4 {
        let mut p = Point::new(format!("b2_{}", k), -(k as f64), 2.0, 0.0);
        if k == 3 {
            p = p.with_annotation("axon");
        }
        tree.add_point(b2, p).unwrap();
    }
    let b3 = tree.add_branch("b3", "b2_2").unwrap();
    tree.add_point(b3, Point::new("b3_1", -2.0, 3.0, 0.0)).unwrap();
    tree
}

/// Three primaries along +x, +y, +z at pixel size 0.5, each forking at world
/// radius 0.5 into one long child (ends at 1.05) and two short perpendicular
/// children (end at ~0.78).
pub fn triple_fork_tree() -> Tree {
    build_tree(
        Transform::new(0.5, 0.5, 0.5),
        [0.0, 0.0, 0.0],
        vec![
            ("x", "root", vec![("x1", [1.0, 0.0, 0.0])]),
            ("xa", "x1", vec![("xa1", [2.1, 0.0, 0.0])]),
            ("xb", "x1", vec![("xb1", [1.0, 1.2, 0.0])]),
            ("xc", "x1", vec![("xc1", [1.0, -1.2, 0.0])]),
            ("y", "root", vec![("y1", [0.0, 1.0, 0.0])]),
            ("ya", "y1", vec![("ya1", [0.0, 2.1, 0.0])]),
            ("yb", "y1", vec![("yb1", [1.2, 1.0, 0.0])]),
            ("yc", "y1", vec![("yc1", [-1.2, 1.0, 0.0])]),
            ("z", "root", vec![("z1", [0.0, 0.0, 1.0])]),
            ("za", "z1", vec![("za1", [0.0, 0.0, 2.1])]),
            ("zb", "z1", vec![("zb1", [1.2, 0.0, 1.0])]),
            ("zc", "z1", vec![("zc1", [-1.2, 0.0, 1.0])]),
        ],
    )
}

/// A 20 µm shaft with a 12 µm side branch at y=15 and, when `with_filo`,
/// a 3 µm filopodium at y=5.
pub fn filo_tree(with_filo: bool) -> Tree {
    let mut defs: Vec<BranchDef> = vec![
        (
            "shaft",
            "root",
            vec![
                ("s5", [0.0, 5.0, 0.0]),
                ("s10", [0.0, 10.0, 0.0]),
                ("s15", [0.0, 15.0, 0.0]),
                ("s20", [0.0, 20.0, 0.0]),
            ],
        ),
        (
            "side",
            "s15",
            vec![("side6", [-6.0, 15.0, 0.0]), ("side12", [-12.0, 15.0, 0.0])],
        ),
    ];
    if with_filo {
        defs.push(("filo", "s5", vec![("f1", [1.5, 5.0, 0.0]), ("f2", [3.0, 5.0, 0.0])]));
    }
    build_tree(Transform::default(), [0.0, 0.0, 0.0], defs)
}
