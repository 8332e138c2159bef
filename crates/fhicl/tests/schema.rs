use fhicl::schema::{self, AtomKind, Parameter, Shape, Table};
use fhicl::{pset, Error};
use pretty_assertions::assert_eq;

fn tracker() -> Table {
    Table::new()
        .member(Parameter::atom("module_type", AtomKind::String))
        .member(Parameter::atom("threshold", AtomKind::Float).comment("in MeV"))
        .member(Parameter::fixed_sequence(
            "origin",
            Shape::Atom(AtomKind::Float),
            3,
        ))
        .member(
            Parameter::sequence(
                "planes",
                Shape::Table(
                    Table::new()
                        .member(Parameter::atom("id", AtomKind::UInt))
                        .member(Parameter::atom("enabled", AtomKind::Bool).with_default("true")),
                ),
            )
            .optional(),
        )
        .member(Parameter::delegated("geometry").optional())
}

#[test]
fn description_of_allowed_configuration() {
    insta::assert_snapshot!(tracker().to_string(), @r###"
    module_type: <string>
    ## in MeV
    threshold: <float>
    origin: [ <float>, <float>, <float> ]
    planes: [ {
       id: <unsigned int>
       enabled: <bool>  # default: true
    }, ... ]  # optional
    geometry: <delegated>  # optional
    "###);
}

#[test]
fn valid_configuration() {
    let pset = pset!(
        r#"
        module_type: Tracker
        threshold: 0.5
        origin: [0, 0, -1.5]
        planes: [ { id: 1 }, { id: 2 enabled: false } ]
        geometry: { file: "detector.gdml" layers: [ { z: 1 } ] }
        "#
    );
    schema::validate(&pset, &tracker(), &[]).unwrap();
}

#[test]
fn every_problem_is_reported_at_once() {
    let pset = pset! {
        "tracker.fcl" => "module_type: Tracker\norigin: [0, 0]\nplanes: [ { id: -1 }, { id: 3 colour: red } ]\nthreshhold: 0.5\n",
    };

    let Err(Error::Validation(message)) = schema::validate(&pset, &tracker(), &["module_label"])
    else {
        panic!("configuration must be rejected");
    };

    assert_eq!(
        message,
        "\
Any parameters prefaced with '#' are missing, any prefaced with '+' are not supported and any prefaced with '!' have the wrong type.

Missing parameters:
  # threshold

Unsupported parameters:
  + planes[1].colour [tracker.fcl:3]
  + threshhold [tracker.fcl:4]

Mistyped parameters:
  ! origin: expected 3 elements, found 2
  ! planes[0].id: expected <unsigned int>, found -1
"
    );
}

#[test]
fn sequence_elements_are_left_alone() {
    let pset = pset!("module_type: T threshold: 1 origin: [1, 2, 3] planes: [ { id: 1 } ]");
    let complete = schema::complete(&pset, &tracker()).unwrap();
    assert_eq!(complete, pset);
    assert!(!complete.has_key("planes[0].enabled"));
}

#[test]
fn defaults_fill_missing_members() {
    let schema = Table::new()
        .member(Parameter::atom("verbosity", AtomKind::Int).with_default("2"))
        .member(Parameter::table(
            "output",
            Table::new()
                .member(Parameter::atom("file", AtomKind::String).with_default("out.root"))
                .member(
                    Parameter::sequence("keep", Shape::Atom(AtomKind::String))
                        .with_default("[\"*\"]"),
                ),
        ));

    let complete = schema::complete(&pset!("output: { keep: [hits] }"), &schema).unwrap();
    assert_eq!(complete.get::<i32>("verbosity").unwrap(), 2);
    assert_eq!(complete.get::<String>("output.file").unwrap(), "out.root");
    assert_eq!(complete.get::<Vec<String>>("output.keep").unwrap(), ["hits"]);
    schema::validate(&complete, &schema, &[]).unwrap();
}
