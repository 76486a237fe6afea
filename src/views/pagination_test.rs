use super::*;

fn loaded(page: u32, page_size: u32, count: u64) -> PageState {
    PageState { page, page_size, count: Some(count), shown: page }
}

#[test]
fn total_pages_rounds_up() {
    assert_eq!(loaded(1, 20, 45).total_pages(), 3);
    assert_eq!(loaded(1, 20, 40).total_pages(), 2);
    assert_eq!(loaded(1, 20, 0).total_pages(), 0);
    assert_eq!(PageState::new(20).total_pages(), 0);
}

#[test]
fn next_on_last_page_is_noop() {
    let mut state = loaded(3, 20, 45);
    assert!(!state.has_next());
    assert!(!state.next());
    assert_eq!(state.page, 3);
}

#[test]
fn next_advances_until_count_reached() {
    let mut state = loaded(1, 20, 45);
    assert!(state.next());
    assert!(state.next());
    assert!(!state.next());
    assert_eq!(state.page, 3);
}

#[test]
fn next_before_load_is_noop() {
    let mut state = PageState::new(20);
    assert!(!state.next());
    assert_eq!(state.page, 1);
}

#[test]
fn prev_stops_at_first_page() {
    let mut state = loaded(2, 20, 45);
    assert!(state.prev());
    assert!(!state.prev());
    assert_eq!(state.page, 1);
}

#[test]
fn zero_page_size_is_clamped() {
    assert_eq!(PageState::new(0).page_size, 1);
}

#[test]
fn absorb_takes_count_and_reset_returns_to_first() {
    let mut state = PageState::new(20);
    state.absorb(&Paginated::<u8> { items: vec![], count: 45, page: 1, page_size: 20 });
    assert_eq!(state.count, Some(45));
    state.next();
    state.reset();
    assert_eq!(state.page, 1);
    assert_eq!(state.request(), PageRequest::new(1, 20));
}

#[test]
fn jump_clamps_to_first_page() {
    let mut state = PageState::new(20);
    state.jump(4);
    assert_eq!(state.request(), PageRequest::new(4, 20));
    state.jump(0);
    assert_eq!(state.page, 1);
}

#[test]
fn rollback_returns_to_shown_page() {
    let mut state = loaded(1, 20, 45);
    assert!(state.next());
    state.rollback();
    assert_eq!(state.page, 1);

    assert!(state.next());
    state.absorb(&Paginated::<()> { items: Vec::new(), count: 45, page: 2, page_size: 20 });
    assert!(state.next());
    state.rollback();
    assert_eq!(state.page, 2);
}
