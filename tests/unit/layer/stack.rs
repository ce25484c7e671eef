use super::*;
use crate::foundation::core::Bgra8Premul;

fn named(name: &str) -> Layer {
    let mut l = Layer::bitmap(4, 4).unwrap();
    l.set_name(name).unwrap();
    l
}

fn names(stack: &LayerStack) -> Vec<&str> {
    stack.iter().map(|l| l.name()).collect()
}

#[test]
fn zero_sized_stack_is_rejected() {
    assert!(LayerStack::new(0, 4).is_err());
    assert!(LayerStack::new(4, 4).unwrap().is_empty());
}

#[test]
fn add_and_insert_keep_bottom_to_top_order() {
    let mut s = LayerStack::new(4, 4).unwrap();
    assert_eq!(s.add(named("a")).unwrap(), 0);
    assert_eq!(s.add(named("c")).unwrap(), 1);
    s.insert(1, named("b")).unwrap();

    assert_eq!(names(&s), vec!["a", "b", "c"]);
    assert_eq!(s.bottom().map(|l| l.name()), Some("a"));
    assert_eq!(s.index_of_name("c"), Some(2));
    assert_eq!(s.index_of_name("zzz"), None);
}

#[test]
fn size_mismatch_is_rejected_without_events() {
    let mut s = LayerStack::new(4, 4).unwrap();
    let sub = s.subscribe();
    let err = s.add(Layer::bitmap(4, 5).unwrap()).unwrap_err();
    assert!(matches!(err, StrataError::Precondition(_)), "{err}");
    assert!(s.is_empty());
    assert!(sub.drain().is_empty());
}

#[test]
fn disposed_layer_is_rejected() {
    let mut s = LayerStack::new(4, 4).unwrap();
    let mut l = Layer::bitmap(4, 4).unwrap();
    l.dispose();
    assert!(matches!(s.add(l), Err(StrataError::Disposed("layer"))));
}

#[test]
fn bad_indices_are_preconditions() {
    let mut s = LayerStack::new(4, 4).unwrap();
    assert!(s.insert(1, named("x")).is_err());
    assert!(s.remove_at(0).is_err());
    assert!(s.replace_at(0, named("x")).is_err());
}

#[test]
fn insert_emits_bracketed_events() {
    let mut s = LayerStack::new(4, 4).unwrap();
    s.add(named("a")).unwrap();
    let sub = s.subscribe();
    s.insert(0, named("b")).unwrap();
    assert_eq!(
        sub.drain(),
        vec![StackEvent::Changing, StackEvent::Inserted(0), StackEvent::Changed]
    );
}

#[test]
fn remove_returns_layer_and_brackets_removal() {
    let mut s = LayerStack::new(4, 4).unwrap();
    s.add(named("a")).unwrap();
    s.add(named("b")).unwrap();
    let sub = s.subscribe();

    let removed = s.remove_at(0).unwrap();
    assert_eq!(removed.name(), "a");
    assert_eq!(names(&s), vec!["b"]);
    assert_eq!(
        sub.drain(),
        vec![
            StackEvent::Changing,
            StackEvent::RemovingAt(0),
            StackEvent::RemovedAt(0),
            StackEvent::Changed,
        ]
    );
}

#[test]
fn replace_is_remove_plus_insert_in_one_bracket() {
    let mut s = LayerStack::new(4, 4).unwrap();
    s.add(named("a")).unwrap();
    let sub = s.subscribe();

    let old = s.replace_at(0, named("z")).unwrap();
    assert_eq!(old.name(), "a");
    assert_eq!(names(&s), vec!["z"]);
    assert_eq!(
        sub.drain(),
        vec![
            StackEvent::Changing,
            StackEvent::RemovingAt(0),
            StackEvent::RemovedAt(0),
            StackEvent::Inserted(0),
            StackEvent::Changed,
        ]
    );
}

#[test]
fn clear_hands_back_every_layer() {
    let mut s = LayerStack::new(4, 4).unwrap();
    s.add(named("a")).unwrap();
    s.add(named("b")).unwrap();
    let sub = s.subscribe();

    let out = s.clear();
    assert_eq!(out.len(), 2);
    assert!(s.is_empty());
    assert_eq!(
        sub.drain(),
        vec![StackEvent::Changing, StackEvent::Cleared, StackEvent::Changed]
    );
}

#[test]
fn get_mut_edits_in_place() {
    let mut s = LayerStack::new(4, 4).unwrap();
    s.add(Layer::bitmap(4, 4).unwrap()).unwrap();
    s.get_mut(0)
        .unwrap()
        .surface_mut()
        .unwrap()
        .clear(Bgra8Premul::WHITE);
    assert_eq!(
        s.get(0).unwrap().surface().unwrap().pixel(3, 3),
        Some(Bgra8Premul::WHITE)
    );
    assert!(s.get(1).is_none());
    assert_eq!((&s).into_iter().count(), 1);
}

#[test]
fn wrong_size_layer_only_enters_through_checked_replace() {
    let mut s = LayerStack::new(4, 4).unwrap();
    s.add(named("keep")).unwrap();
    let sub = s.subscribe();

    let err = s.replace_at(0, Layer::bitmap(8, 4).unwrap()).unwrap_err();
    assert!(matches!(err, StrataError::Precondition(_)), "{err}");
    assert!(sub.drain().is_empty());
    assert_eq!(names(&s), ["keep"]);
    assert!(s.iter().all(|l| l.size() == s.size()));
}

#[test]
fn edit_handles_keep_layer_size() {
    let mut s = LayerStack::new(4, 4).unwrap();
    s.add(named("a")).unwrap();
    s.add(named("b")).unwrap();

    for mut layer in s.iter_mut() {
        layer.set_opacity(10).unwrap();
        layer.surface_mut().unwrap().clear(Bgra8Premul::BLACK);
    }
    assert!(s.iter().all(|l| l.opacity() == 10 && l.size() == Size::new(4, 4)));
    assert!(s.iter().all(|l| l.surface().unwrap().pixel(0, 0) == Some(Bgra8Premul::BLACK)));
}
