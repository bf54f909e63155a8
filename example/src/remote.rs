//! In-process stand-in for a server streaming a chunked result.
use bytes::Bytes;
use futures::{Stream, stream};
use rowstitch::{Code, Field, Fragment, Stats, Status, Type, Value};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

const NAMES: [&str; 6] = ["Deez", "Foo", "Barbara", "Quux", "Lorem Ipsum", "Nuts"];

#[derive(Clone)]
pub struct Remote {
    fragments: Arc<[Fragment]>,
    failures: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl Remote {
    /// Remote that drops the connection on the first `failures` calls.
    pub fn new(failures: usize) -> Self {
        Self {
            fragments: Arc::from(fragments()),
            failures: Arc::new(AtomicUsize::new(failures)),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Serve the result from after `resume_token`.
    pub fn call(
        &self,
        resume_token: Bytes,
    ) -> impl Stream<Item = Result<Fragment, Status>> + Unpin + Send + use<> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        let start = match resume_token.is_empty() {
            true => 0,
            false => self
                .fragments
                .iter()
                .position(|f| f.resume_token == resume_token)
                .map_or(0, |i| i + 1),
        };

        let mut items: Vec<_> = self.fragments[start..].iter().cloned().map(Ok).collect();

        let fail = self
            .failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            items.truncate(3);
            items.push(Err(Status::new(Code::Unavailable, "connection reset by peer")));
        }

        stream::iter(items)
    }
}

fn fragments() -> Vec<Fragment> {
    let fields = vec![
        Field::new("id", Type::Int64),
        Field::new("name", Type::String),
        Field::new("tags", Type::array(Type::String)),
    ];

    let mut fragments = vec![];
    for (i, name) in NAMES.iter().enumerate() {
        let (head, tail) = name.split_at(name.len() / 2);
        let tags = Value::from(vec![format!("tag{i}"), "common".to_owned()]);

        let mut first = Fragment::new(vec![(i + 1).to_string().into(), head.into()]).chunked();
        if i == 0 {
            first = first.metadata(fields.clone());
        }
        fragments.push(first);

        let mut second = Fragment::new(vec![tail.into(), tags]);
        if i % 2 == 1 {
            second = second.resume_token(format!("t{i}"));
        }
        fragments.push(second);
    }

    fragments.push(Fragment::new(vec![]).stats(Stats {
        row_count_exact: Some(NAMES.len() as i64),
        ..Default::default()
    }));
    fragments
}
