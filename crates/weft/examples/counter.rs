//! Example: a click counter with a filtered item list

use weft::{element, observe, Renderer, Runtime};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    weft::init_tracing();

    let runtime = Runtime::default();
    let clicks = runtime.observed(0u32);
    let items = runtime.observed_vec(vec![String::from("first")]);

    let (counter, list) = (clicks.clone(), items.clone());
    let odd = clicks.clone();
    let root = runtime.render(
        element("main")
            .child(
                element("button")
                    .id("add")
                    .text(&clicks)
                    .on("click", move |_| {
                        counter.update(|n| *n += 1);
                        list.push(format!("item {}", counter.get()));
                    }),
            )
            .child(Renderer::conditional(observe(&[&clicks]), move || {
                (odd.get() % 2 == 1).then_some("odd").into()
            }))
            .child(element("ul").child(Renderer::list(&items, |i, item| {
                element("li").attr("data-index", i).text(item.as_str()).into()
            }))),
    )?;

    let button = runtime
        .document()
        .get_element_by_id("add")
        .ok_or_else(|| anyhow::anyhow!("button not rendered"))?;
    for _ in 0..3 {
        runtime.dispatch(button, "click");
    }

    println!("weft v{}", weft::VERSION);
    println!("rendered text: {}", root.text_content());
    println!("flushes: {}", runtime.context().flush_count());
    Ok(())
}
