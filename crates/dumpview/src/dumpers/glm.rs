//! glm vector math: `glm::vec<N, T, Q>` and `glm::qua<T, Q>`.
//!
//! Both are plain arrays of components named x, y, z, w. Quaternions use the
//! default xyzw storage order.

use crate::dumpers::{slot_value, DumperEntry};
use crate::inspector::{with_children, DumpError, DumpResult, Inspector, Value};
use memlayout::{FieldKind, LayoutPattern, TypeName};

pub const DUMPERS: &[DumperEntry] = &[
    DumperEntry {
        name: "glm::vec",
        description: "Vector of 1 to 4 components shown as [ x, y, ... ]",
        dump: dump_vec,
        formats: &[],
        layout: vec_layout,
    },
    DumperEntry {
        name: "glm::qua",
        description: "Quaternion, shown like a 4 component vector",
        dump: dump_qua,
        formats: &[],
        layout: qua_layout,
    },
];

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

fn components(count: usize, elem: &TypeName) -> LayoutPattern {
    LayoutPattern::new(vec![FieldKind::Typed(elem.clone()); count])
}

fn component_count(type_name: &TypeName) -> Option<usize> {
    let count = type_name.int_arg(0)? as usize;
    (1..=COMPONENTS.len()).contains(&count).then_some(count)
}

fn vec_layout(type_name: &TypeName) -> Option<LayoutPattern> {
    Some(components(component_count(type_name)?, type_name.arg(1)?))
}

fn qua_layout(type_name: &TypeName) -> Option<LayoutPattern> {
    Some(components(4, type_name.arg(0)?))
}

pub fn dump_vec(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    let count = component_count(&value.type_name).ok_or_else(|| {
        DumpError::BadTemplateArgument(format!(
            "{} is not a 1 to 4 component vector",
            value.type_name
        ))
    })?;
    dump_components(d, value, count, value.type_arg(1)?)
}

pub fn dump_qua(d: &mut dyn Inspector, value: &Value) -> DumpResult<()> {
    dump_components(d, value, 4, value.type_arg(0)?)
}

fn dump_components(
    d: &mut dyn Inspector,
    value: &Value,
    count: usize,
    elem: &TypeName,
) -> DumpResult<()> {
    let (fields, _) = d.split(&components(count, elem), value.addr)?;
    let parts = (0..count)
        .map(|i| slot_value(&fields, i))
        .collect::<DumpResult<Vec<_>>>()?;

    if count >= 2 {
        let shown: Vec<String> = parts.iter().map(|part| d.display(part)).collect();
        d.put_value(format!("[ {} ]", shown.join(", ")));
    }
    d.put_num_child(count);

    if d.is_expanded() {
        with_children(d, None, |d| {
            // Listed last component first.
            for (name, part) in COMPONENTS.iter().zip(&parts).rev() {
                d.put_sub_item(name, part);
            }
            Ok(())
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dumpers::testing::{dump, names};
    use crate::inspector::mock::MockMemory;
    use crate::inspector::DumpOptions;

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_vec2_children_reversed() {
        let memory = MockMemory::new().with(0x400, &floats(&[1.5, -2.5]));
        let view = dump(
            &memory,
            "glm::vec<2, float, glm::packed_highp>",
            0x400,
            &DumpOptions::default(),
        );

        assert_eq!(view.value.as_deref(), Some("[ 1.5, -2.5 ]"));
        assert_eq!(view.num_child, 2);
        assert_eq!(names(&view), ["y", "x"]);
        assert_eq!(view.child("y").unwrap().value.as_deref(), Some("-2.5"));
        assert_eq!(view.child("y").unwrap().address, "0x404");
    }

    #[test]
    fn test_vec3_and_vec4() {
        let ints: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let memory = MockMemory::new()
            .with(0x400, &ints)
            .with(0x500, &floats(&[0.25, 0.5, 0.75, 1.25]));

        let view = dump(&memory, "glm::vec<3, int, glm::packed_highp>", 0x400, &DumpOptions::default());
        assert_eq!(view.value.as_deref(), Some("[ 1, 2, 3 ]"));
        assert_eq!(names(&view), ["z", "y", "x"]);

        let view = dump(
            &memory,
            "glm::vec<(glm::length_t)4, float, glm::packed_highp>",
            0x500,
            &DumpOptions::default(),
        );
        assert_eq!(view.value.as_deref(), Some("[ 0.25, 0.5, 0.75, 1.25 ]"));
        assert_eq!(names(&view), ["w", "z", "y", "x"]);
        assert_eq!(view.child("w").unwrap().value.as_deref(), Some("1.25"));
    }

    #[test]
    fn test_qua_matches_vec4() {
        let memory = MockMemory::new().with(0x600, &floats(&[0.0, 0.5, 0.0, 1.0]));
        let view = dump(&memory, "glm::qua<float, glm::packed_highp>", 0x600, &DumpOptions::default());

        assert_eq!(view.value.as_deref(), Some("[ 0, 0.5, 0, 1 ]"));
        assert_eq!(view.num_child, 4);
        assert_eq!(names(&view), ["w", "z", "y", "x"]);
    }

    #[test]
    fn test_single_component_has_no_display() {
        let memory = MockMemory::new().with(0x400, &floats(&[3.0]));
        let view = dump(&memory, "glm::vec<1, float, glm::packed_highp>", 0x400, &DumpOptions::default());
        assert!(view.value.is_none());
        assert_eq!(names(&view), ["x"]);
    }

    #[test]
    fn test_bad_component_count() {
        let memory = MockMemory::new().with_zeroed(0x400, 32);
        let view = dump(&memory, "glm::vec<5, float, glm::packed_highp>", 0x400, &DumpOptions::default());
        assert_eq!(view.value.as_deref(), Some("<not accessible>"));
        assert!(view.error.unwrap().contains("component"));
    }

    #[test]
    fn test_vectors_of_vectors() {
        let memory = MockMemory::new()
            .with_words(0x100, &[0x2000, 0x2018, 0x2018])
            .with(0x2000, &floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
        let view = dump(
            &memory,
            "tinystl::vector<glm::vec<3, float, glm::packed_highp>>",
            0x100,
            &DumpOptions::default(),
        );

        assert_eq!(view.item_count, Some(2));
        assert_eq!(view.children[1].value.as_deref(), Some("[ 4, 5, 6 ]"));
        assert_eq!(view.children[1].address, "0x200c");
        assert!(view.children[1].children.is_empty());
    }
}
