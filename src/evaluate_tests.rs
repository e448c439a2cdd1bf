#[cfg(test)]
mod tests {
    use crate::compile::compile_str;
    use crate::element::{Element, FRAGMENT_TAG, TEXT_TAG};
    use crate::evaluate::evaluate;
    use crate::state::StateNode;
    use crate::template::{ElementTemplate, LoopTemplate, Template, TextPart};
    use crate::test_support::{setup, todo_state};

    fn eval(source: &str, state: &StateNode) -> Element {
        setup();
        let template = compile_str(source).unwrap();
        evaluate(&template, state)
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Attributes and text
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_simple_parsing() {
        let state = StateNode::new().with("key", "inputvalue");
        let element = eval(r#"<input [value]="key" type="text">"#, &state);

        assert_eq!(element.tag(), "input");
        assert_eq!(element.child_count(), 0);
        assert_eq!(element.attribute_names().count(), 2);
        assert_eq!(element.attribute("value"), Some("inputvalue"));
        assert_eq!(element.attribute("type"), Some("text"));
    }

    #[test]
    fn test_static_child_template() {
        let state = StateNode::new().with("key", "inputvalue");
        let element = eval(r#"<div class="parent"><input [value]="key"></div>"#, &state);

        assert_eq!(element.tag(), "div");
        assert_eq!(element.attribute("class"), Some("parent"));
        assert_eq!(element.child_count(), 1);

        let child = element.child(0).unwrap();
        assert_eq!(child.tag(), "input");
        assert_eq!(child.child_count(), 0);
        assert_eq!(child.attribute("value"), Some("inputvalue"));
    }

    #[test]
    fn test_static_inline_text() {
        let source = "<span>Hello</span>";
        let element = eval(source, &StateNode::new());
        assert_eq!(element.to_string(), source);
    }

    #[test]
    fn test_dynamic_text() {
        let state = StateNode::new().with("greeting", "Hello, world");
        let element = eval(r#"<span class="greeting">{{greeting}}</span>"#, &state);
        assert_eq!(
            element.to_string(),
            r#"<span class="greeting">Hello, world</span>"#
        );
    }

    #[test]
    fn test_element_text_content_is_its_text() {
        let state = StateNode::new().with("greeting", "Hello, world");
        let span = eval("<span>{{greeting}}</span>", &state);
        assert_eq!(span.text_content().as_deref(), Some("Hello, world"));

        let state = todo_state("Outer", 2);
        let list = eval(
            "<ul>Items: <li *ng-for='#todo of todos'>{{todo.title}};</li></ul>",
            &state,
        );
        assert_eq!(list.text_content().as_deref(), Some("Items: Todo 0;Todo 1;"));
    }

    #[test]
    fn test_scalar_values_render_as_text() {
        let state = StateNode::new()
            .with("count", 3_i64)
            .with("ratio", 2.5)
            .with("whole", 3.0)
            .with("done", true);
        let element = eval(
            "<p [data-done]='done'>{{count}}/{{ratio}}/{{whole}}</p>",
            &state,
        );
        assert_eq!(element.attribute("data-done"), Some("true"));
        assert_eq!(element.child(0).and_then(Element::text_content).as_deref(), Some("3/2.5/3"));
    }

    #[test]
    fn test_non_finite_floats_render_as_words() {
        let state = StateNode::new()
            .with("high", f64::INFINITY)
            .with("low", f64::NEG_INFINITY)
            .with("none", f64::NAN);
        let element = eval("<meter [max]='high' [min]='low'>{{none}}</meter>", &state);
        assert_eq!(
            element.to_string(),
            r#"<meter max="Infinity" min="-Infinity">NaN</meter>"#
        );
    }

    #[test]
    fn test_missing_path_omits_attribute_and_empties_text() {
        let state = StateNode::new().with("owner", StateNode::new().with("name", "Ada"));
        let element = eval(
            r#"<p [title]="missing" [lang]="owner.missing" id="x">a{{missing}}b{{owner}}c</p>"#,
            &state,
        );
        assert_eq!(element.attribute_names().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(element.to_string(), r#"<p id="x">abc</p>"#);
    }

    #[test]
    fn test_text_children_are_text_elements() {
        let element = eval("<p>one<b>two</b></p>", &StateNode::new());
        let first = element.child(0).unwrap();
        assert_eq!(first.tag(), TEXT_TAG);
        assert!(first.is_text());
        assert_eq!(first.text_content().as_deref(), Some("one"));
        assert_eq!(element.child(1).unwrap().tag(), "b");
    }

    #[test]
    fn test_interpolated_text_is_escaped_on_output() {
        let state = StateNode::new().with("markup", "<b>&</b>");
        let element = eval("<p [title]='markup'>{{markup}}</p>", &state);
        assert_eq!(
            element.to_string(),
            r#"<p title="&lt;b&gt;&amp;&lt;/b&gt;">&lt;b&gt;&amp;&lt;/b&gt;</p>"#
        );
    }

    #[test]
    fn test_script_tag() {
        let element = eval(
            "<div><script type='text/javascript'>window.alert('hello');</script></div>",
            &StateNode::new(),
        );
        assert_eq!(element.child_count(), 1);

        let script = element.child(0).unwrap();
        assert_eq!(script.tag(), "script");
        assert_eq!(script.attribute("type"), Some("text/javascript"));
        assert_eq!(script.text_content().as_deref(), Some("window.alert('hello');"));
    }

    #[test]
    fn test_raw_text_is_neither_interpolated_nor_escaped() {
        let state = StateNode::new().with("x", "nope");
        let element = eval("<style>a > b { content: '{{x}}'; }</style>", &state);
        assert_eq!(element.text_content().as_deref(), Some("a > b { content: '{{x}}'; }"));
        assert_eq!(
            element.to_string(),
            "<style>a > b { content: '{{x}}'; }</style>"
        );
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Loops
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_for_loop() {
        let state = todo_state("Outer title", 3);
        let element = eval(
            "<ul><li *ng-for='#todo of todos' [innertitle]='todo.title' [outertitle]='title'>{{todo.title}}</li></ul>",
            &state,
        );

        assert_eq!(element.tag(), "ul");
        assert_eq!(element.child_count(), 3);
        for i in 0..3 {
            let li = element.child(i).unwrap();
            let expected = format!("Todo {}", i);
            assert_eq!(li.child_count(), 1);
            assert_eq!(li.attribute_names().count(), 2);
            assert_eq!(li.attribute("outertitle"), Some("Outer title"));
            assert_eq!(li.attribute("innertitle"), Some(expected.as_str()));
            assert_eq!(li.child(0).unwrap().outer_html(), expected);
        }
    }

    #[test]
    fn test_loop_over_missing_or_empty_list() {
        let source = "<ul><li *ng-for='#t of todos'>{{t.title}}</li><li>tail</li></ul>";

        let element = eval(source, &StateNode::new());
        assert_eq!(element.to_string(), "<ul><li>tail</li></ul>");

        let element = eval(source, &todo_state("x", 0));
        assert_eq!(element.child_count(), 1);

        let element = eval(source, &StateNode::new().with("todos", "not a list"));
        assert_eq!(element.child_count(), 1);
    }

    #[test]
    fn test_loop_alias_shadows_root_key() {
        let state = todo_state("Outer", 2).with("todo", StateNode::new().with("title", "root todo"));
        let element = eval(
            "<div><p>{{todo.title}}</p><i *ng-for='let todo of todos'>{{todo.title}}</i></div>",
            &state,
        );
        assert_eq!(
            element.to_string(),
            "<div><p>root todo</p><i>Todo 0</i><i>Todo 1</i></div>"
        );
    }

    #[test]
    fn test_nested_loops_see_every_enclosing_frame() {
        let mut state = StateNode::new().with("title", "Board");
        let columns = state.multi_valued_mut("columns");
        for c in 0..2 {
            let mut column = StateNode::new().with("name", format!("col{}", c));
            let cards = column.multi_valued_mut("cards");
            for k in 0..2 {
                let mut card = StateNode::new().with("name", format!("card{}{}", c, k));
                card.multi_valued_mut("tags")
                    .push(StateNode::new().with("name", format!("tag{}{}", c, k)));
                cards.push(card);
            }
            columns.push(column);
        }

        let element = eval(
            "<div>\
               <section *ng-for='#col of columns'>\
                 <article *ng-for='#card of col.cards'>\
                   <span *ng-for='#name of card.tags' [title]='title' [data-col]='col.name'>{{card.name}}:{{name.name}}</span>\
                 </article>\
               </section>\
             </div>",
            &state,
        );

        assert_eq!(element.child_count(), 2);
        let span = element
            .child(1)
            .and_then(|s| s.child(0))
            .and_then(|a| a.child(0))
            .unwrap();
        assert_eq!(span.attribute("title"), Some("Board"));
        assert_eq!(span.attribute("data-col"), Some("col1"));
        assert_eq!(span.child(0).and_then(Element::text_content).as_deref(), Some("card10:tag10"));
    }

    #[test]
    fn test_hand_built_loop_root_yields_fragment() {
        let template = Template::Loop(LoopTemplate {
            item_alias: "todo".to_string(),
            source_path: "todos".parse().unwrap(),
            body: Box::new(Template::Element(ElementTemplate {
                tag: "li".to_string(),
                attributes: Vec::new(),
                children: vec![Template::InterpolatedText {
                    parts: vec![TextPart::Binding("todo.title".parse().unwrap())],
                }],
            })),
        });

        let fragment = evaluate(&template, &todo_state("x", 2));
        assert_eq!(fragment.tag(), FRAGMENT_TAG);
        assert_eq!(fragment.child_count(), 2);
        assert_eq!(fragment.to_string(), "<li>Todo 0</li><li>Todo 1</li>");
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // Determinism
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_evaluation_is_repeatable() {
        setup();
        let template = compile_str(
            "<ul title='t'><li *ng-for='#todo of todos' [title]='todo.title'>{{title}}</li></ul>",
        )
        .unwrap();
        let state = todo_state("Outer", 4);

        let first = evaluate(&template, &state);
        let second = evaluate(&template, &state);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn test_serialized_output_recompiles_to_same_tree() {
        let state = todo_state("Outer", 2);
        let rendered = eval(
            "<ul class='list'><li *ng-for='#todo of todos' [title]='todo.title'><input type='checkbox' checked>{{todo.title}}</li></ul>",
            &state,
        );
        let html = rendered.to_string();
        assert_eq!(
            html,
            r#"<ul class="list"><li title="Todo 0"><input type="checkbox" checked>Todo 0</li><li title="Todo 1"><input type="checkbox" checked>Todo 1</li></ul>"#
        );

        let reparsed = eval(&html, &StateNode::new());
        assert_eq!(reparsed, rendered);
    }
}
