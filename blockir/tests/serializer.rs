use blockir::Program;
use blockir::block::ArgumentValue;
use blockir::serializer::{
    ArgumentShape, DiagnosticKind, Mode, Outcome, SerializeError, Serializer, classify,
};
use blockir::tree::{Node, Tag};
use blockir::variable::{Lookup, ValueType, lookup};
use blockir::xml;

fn try_serialize(source: &str) -> Result<Outcome, SerializeError> {
    let root = xml::parse(source).expect("xml parse failed");
    Serializer::lenient().serialize(&root)
}

fn serialize(source: &str) -> Outcome {
    try_serialize(source).expect("serialization failed")
}

fn program(source: &str) -> Program {
    serialize(source).program
}

#[test]
fn single_block_yields_one_chain_of_one() {
    let program = program(r#"<xml><variables/><block type="services_send" id="b1"/></xml>"#);
    assert_eq!(program.blocks.len(), 1);
    assert_eq!(program.blocks[0].len(), 1);
    let block = &program.blocks[0][0];
    assert_eq!(block.id, "b1");
    assert_eq!(block.block_type, "services_send");
    assert!(block.args.is_empty());
    assert!(block.contents.is_empty());
}

#[test]
fn args_length_matches_argument_children() {
    let program = program(
        r#"<xml><variables/>
        <block type="data_insertatlist" id="b1">
            <field name="VAR">items</field>
            <value name="INDEX"><shadow type="math_number"><field name="NUM">1</field></shadow></value>
            <value name="ITEM"><shadow type="text"><field name="TEXT">hi</field></shadow></value>
        </block></xml>"#,
    );
    assert_eq!(program.blocks[0][0].args.len(), 3);
}

#[test]
fn field_argument_lowercases_name() {
    let program = program(
        r#"<xml><variables/>
        <block type="data_variable" id="b1"><field name="VAR">counter</field></block></xml>"#,
    );
    let arg = &program.blocks[0][0].args[0];
    assert_eq!(arg.kind, "var");
    assert_eq!(arg.value, ArgumentValue::Text("counter".to_string()));
}

#[test]
fn constant_argument_from_shadow() {
    let program = program(
        r#"<xml><variables/>
        <block type="control_wait" id="b1">
            <value name="SECONDS"><shadow type="math_number"><field name="NUM">42</field></shadow></value>
        </block></xml>"#,
    );
    let arg = &program.blocks[0][0].args[0];
    assert_eq!(arg.kind, "constant");
    assert_eq!(arg.value, ArgumentValue::Text("42".to_string()));
}

#[test]
fn block_argument_matches_independent_serialization() {
    let inner = r#"<block type="operator_add" id="a1">
        <value name="NUM1"><shadow type="math_number"><field name="NUM">1</field></shadow></value>
        <value name="NUM2"><shadow type="math_number"><field name="NUM">2</field></shadow></value>
    </block>"#;

    let plugged = program(&format!(
        r#"<xml><variables/>
        <block type="data_setvariableto" id="s1">
            <field name="VAR">counter</field>
            <value name="VALUE">
                <shadow type="math_number"><field name="NUM">0</field></shadow>
                {inner}
            </value>
        </block></xml>"#
    ));
    let standalone = program(&format!(r#"<xml><variables/>{inner}</xml>"#));

    let arg = &plugged.blocks[0][0].args[1];
    assert_eq!(arg.kind, "block");
    match &arg.value {
        ArgumentValue::Blocks(chain) => assert_eq!(chain, &standalone.blocks[0]),
        other => panic!("expected a block argument, got {:?}", other),
    }
}

#[test]
fn next_links_flatten_in_order() {
    let program = program(
        r#"<xml><variables/>
        <block type="first" id="b1">
            <next><block type="second" id="b2">
                <next><block type="third" id="b3"/></next>
            </block></next>
        </block></xml>"#,
    );
    assert_eq!(program.blocks.len(), 1);
    let ids: Vec<&str> = program.blocks[0].iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, ["b1", "b2", "b3"]);
    assert!(program.blocks[0].iter().all(|b| b.contents.is_empty()));
}

#[test]
fn statement_contents_hold_the_nested_chain() {
    let program = program(
        r#"<xml><variables/>
        <block type="control_repeat" id="r1">
            <value name="TIMES"><shadow type="math_number"><field name="NUM">10</field></shadow></value>
            <statement name="SUBSTACK">
                <block type="data_changevariableby" id="c1">
                    <field name="VAR">counter</field>
                    <next><block type="control_wait" id="w1">
                        <value name="SECONDS"><shadow type="math_number"><field name="NUM">1</field></shadow></value>
                    </block></next>
                </block>
            </statement>
            <next><block type="services_send" id="s1"/></next>
        </block></xml>"#,
    );
    let chain = &program.blocks[0];
    let ids: Vec<&str> = chain.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, ["r1", "s1"]);

    let contents: Vec<&str> = chain[0].contents.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(contents, ["c1", "w1"]);
    assert!(chain[1].contents.is_empty());
}

#[test]
fn two_top_level_blocks_and_one_variable() {
    let program = program(
        r#"<xml>
        <variables><variable type="" id="v1">counter</variable></variables>
        <block type="chat_whenreceivecommand" id="t1"/>
        <block type="chat_whenreceivecommand" id="t2"/>
        </xml>"#,
    );
    assert_eq!(program.variables.len(), 1);
    assert_eq!(program.blocks.len(), 2);
    assert_eq!(program.blocks[0].len(), 1);
    assert_eq!(program.blocks[1].len(), 1);
}

#[test]
fn sibling_order_follows_source_order() {
    let forward = program(
        r#"<xml><variables/><block type="a" id="b1"/><block type="b" id="b2"/></xml>"#,
    );
    let reversed = program(
        r#"<xml><variables/><block type="b" id="b2"/><block type="a" id="b1"/></xml>"#,
    );
    assert_eq!(forward.blocks[0][0].id, "b1");
    assert_eq!(forward.blocks[1][0].id, "b2");
    assert_eq!(reversed.blocks[0][0].id, "b2");
    assert_eq!(reversed.blocks[1][0].id, "b1");
}

#[test]
fn argument_order_is_never_reordered() {
    let program = program(
        r#"<xml><variables/>
        <block type="data_replaceitemoflist" id="b1">
            <field name="VAR">items</field>
            <value name="INDEX"><shadow type="math_number"><field name="NUM">3</field></shadow></value>
            <field name="MODE">all</field>
        </block></xml>"#,
    );
    let kinds: Vec<&str> = program.blocks[0][0]
        .args
        .iter()
        .map(|a| a.kind.as_str())
        .collect();
    assert_eq!(kinds, ["var", "constant", "mode"]);
}

#[test]
fn variable_records_carry_id_name_and_type() {
    let program = program(
        r#"<xml><variables><variable type="integer" id="var1">counter</variable></variables></xml>"#,
    );
    assert_eq!(program.variables.len(), 1);
    let variable = &program.variables[0];
    assert_eq!(variable.id, "var1");
    assert_eq!(variable.name, "counter");
    assert_eq!(variable.value_type, ValueType::Integer);
    assert!(program.blocks.is_empty());
}

#[test]
fn annotations_normalize_through_the_toolbox_vocabulary() {
    let outcome = serialize(
        r#"<xml><variables>
        <variable type="string" id="v1">a</variable>
        <variable type="boolean" id="v2">b</variable>
        <variable type="integer" id="v3">c</variable>
        <variable type="" id="v4">d</variable>
        <variable type="float" id="v5">e</variable>
        <variable id="v6">f</variable>
        <variable type="matrix" id="v7">g</variable>
        </variables></xml>"#,
    );
    let types: Vec<ValueType> = outcome
        .program
        .variables
        .iter()
        .map(|v| v.value_type)
        .collect();
    assert_eq!(
        types,
        [
            ValueType::String,
            ValueType::Boolean,
            ValueType::Integer,
            ValueType::Any,
            ValueType::Any,
            ValueType::Any,
            ValueType::Any,
        ]
    );

    assert_eq!(outcome.diagnostics.len(), 2);
    assert_eq!(
        outcome.diagnostics[0].kind,
        DiagnosticKind::MissingTypeAnnotation
    );
    assert!(outcome.diagnostics[0].is_warning());
    assert_eq!(outcome.diagnostics[1].kind, DiagnosticKind::UnknownType);
    assert!(!outcome.diagnostics[1].is_warning());
}

#[test]
fn lookup_vocabulary() {
    assert_eq!(lookup(""), Lookup::Known(ValueType::Any));
    assert_eq!(lookup("string"), Lookup::Known(ValueType::String));
    assert_eq!(lookup("boolean"), Lookup::Known(ValueType::Boolean));
    assert_eq!(lookup("integer"), Lookup::Known(ValueType::Integer));
    assert_eq!(lookup("float"), Lookup::Unsupported);
    assert_eq!(lookup("number"), Lookup::Unsupported);
    assert_eq!(lookup("matrix"), Lookup::Unknown);
}

#[test]
fn serialization_is_idempotent() {
    let source = r#"<xml>
    <variables><variable type="integer" id="v1">counter</variable></variables>
    <block type="control_repeat" id="r1">
        <value name="TIMES"><shadow type="math_number"><field name="NUM">10</field></shadow></value>
        <statement name="SUBSTACK">
            <block type="data_changevariableby" id="c1"><field name="VAR">counter</field></block>
        </statement>
    </block></xml>"#;
    assert_eq!(program(source), program(source));
}

#[test]
fn json_document_shape() {
    let value = serde_json::to_value(program(
        r#"<xml>
        <variables><variable type="string" id="v1">greeting</variable></variables>
        <block type="data_setvariableto" id="s1">
            <field name="VAR">greeting</field>
            <value name="VALUE"><shadow type="text"><field name="TEXT">hello</field></shadow></value>
        </block></xml>"#,
    ))
    .expect("document must encode");

    assert_eq!(
        value,
        serde_json::json!({
            "variables": [{"id": "v1", "name": "greeting", "type": "string"}],
            "blocks": [[{
                "id": "s1",
                "type": "data_setvariableto",
                "args": [
                    {"type": "var", "value": "greeting"},
                    {"type": "constant", "value": "hello"},
                ],
                "contents": [],
            }]],
        })
    );
}

#[test]
fn malformed_argument_coerces_to_constant() {
    let outcome = serialize(
        r#"<xml><variables/>
        <block type="control_wait" id="b1">
            <value name="SECONDS">
                <shadow type="math_number"><field name="NUM">7</field></shadow>
                <shadow type="math_number"><field name="NUM">8</field></shadow>
            </value>
        </block></xml>"#,
    );
    let arg = &outcome.program.blocks[0][0].args[0];
    assert_eq!(arg.kind, "constant");
    assert_eq!(arg.value, ArgumentValue::Text("7".to_string()));

    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::MalformedArgument);
    assert_eq!(outcome.diagnostics[0].block.as_deref(), Some("b1"));
}

#[test]
fn malformed_argument_without_fallback_is_fatal() {
    let result = try_serialize(
        r#"<xml><variables/>
        <block type="control_wait" id="b1"><value name="SECONDS"/></block></xml>"#,
    );
    assert!(matches!(
        result,
        Err(SerializeError::MalformedArgument { block }) if block == "b1"
    ));
}

#[test]
fn strict_mode_rejects_error_diagnostics() {
    let source = r#"<xml><variables><variable type="matrix" id="v1">m</variable></variables></xml>"#;
    let root = xml::parse(source).expect("xml parse failed");

    assert!(Serializer::lenient().serialize(&root).is_ok());

    match Serializer::new(Mode::Strict).serialize(&root) {
        Err(SerializeError::Rejected(diagnostics)) => {
            assert_eq!(diagnostics.len(), 1);
            assert_eq!(diagnostics[0].kind, DiagnosticKind::UnknownType);
        }
        other => panic!("expected strict rejection, got {:?}", other),
    }
}

#[test]
fn strict_mode_tolerates_warnings() {
    let source = r#"<xml><variables><variable id="v1">untyped</variable></variables></xml>"#;
    let root = xml::parse(source).expect("xml parse failed");
    let outcome = Serializer::strict()
        .serialize(&root)
        .expect("warnings must not reject");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(outcome.diagnostics[0].is_warning());
}

#[test]
fn dangling_links_are_fatal() {
    let next = try_serialize(
        r#"<xml><variables/><block type="a" id="b1"><next/></block></xml>"#,
    );
    assert!(matches!(
        next,
        Err(SerializeError::DanglingLink { link: "next", .. })
    ));

    let statement = try_serialize(
        r#"<xml><variables/><block type="a" id="b1"><statement name="S"/></block></xml>"#,
    );
    assert!(matches!(
        statement,
        Err(SerializeError::DanglingLink { link: "statement", .. })
    ));
}

#[test]
fn duplicate_statement_keeps_the_first_and_warns() {
    let outcome = serialize(
        r#"<xml><variables/>
        <block type="control_if_else" id="b1">
            <statement name="THEN"><block type="first" id="t1"/></statement>
            <statement name="ELSE"><block type="second" id="t2"/></statement>
        </block></xml>"#,
    );
    let contents: Vec<&str> = outcome.program.blocks[0][0]
        .contents
        .iter()
        .map(|b| b.id.as_str())
        .collect();
    assert_eq!(contents, ["t1"]);

    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::DuplicateLink);
    assert!(outcome.diagnostics[0].is_warning());
}

#[test]
fn missing_variable_container_is_fatal() {
    assert!(matches!(
        try_serialize("<xml/>"),
        Err(SerializeError::MissingVariableContainer)
    ));
    assert!(matches!(
        try_serialize(r#"<xml><block type="a" id="b1"/></xml>"#),
        Err(SerializeError::MissingVariableContainer)
    ));
}

#[test]
fn non_block_top_level_child_is_fatal() {
    let result = try_serialize(r#"<xml><variables/><mutation/></xml>"#);
    assert!(matches!(
        result,
        Err(SerializeError::UnexpectedTopLevel { tag }) if tag == "mutation"
    ));
}

#[test]
fn block_without_type_is_fatal() {
    let result = try_serialize(r#"<xml><variables/><block id="b1"/></xml>"#);
    assert!(matches!(
        result,
        Err(SerializeError::BlockWithoutType { id }) if id == "b1"
    ));
}

#[test]
fn field_without_name_is_fatal() {
    let result = try_serialize(
        r#"<xml><variables/><block type="a" id="b1"><field>5</field></block></xml>"#,
    );
    assert!(matches!(
        result,
        Err(SerializeError::MissingFieldName { block }) if block == "b1"
    ));
}

#[test]
fn classify_recognizes_the_three_shapes() {
    let field = Node::new(Tag::Field).with_attr("name", "NUM").with_text("5");
    assert!(matches!(classify(&field), ArgumentShape::Field(_)));

    let shadow = Node::new(Tag::Shadow).with_child(Node::new(Tag::Field).with_text("5"));
    let constant = Node::new(Tag::Value).with_child(shadow.clone());
    assert!(matches!(
        classify(&constant),
        ArgumentShape::ShadowConstant(_)
    ));

    let plugged = Node::new(Tag::Value)
        .with_child(shadow.clone())
        .with_child(Node::new(Tag::Block).with_attr("type", "operator_add"));
    assert!(matches!(classify(&plugged), ArgumentShape::NestedBlock(_)));

    let empty = Node::new(Tag::Value);
    assert!(matches!(classify(&empty), ArgumentShape::Malformed));

    let two_shadows = Node::new(Tag::Value)
        .with_child(shadow.clone())
        .with_child(shadow);
    assert!(matches!(classify(&two_shadows), ArgumentShape::Malformed));
}
