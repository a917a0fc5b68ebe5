use x3d_filter::*;

const SCENE: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset>
    <contributor><author>Ada</author><authoring_tool>Blender 2.79</authoring_tool></contributor>
    <created>2021-03-04T05:06:07Z</created>
    <modified>2021-03-04T05:06:07Z</modified>
    <unit name="meter" meter="1"/>
    <up_axis>Y_UP</up_axis>
  </asset>
  <library_cameras>
    <camera id="cam" name="Front">
      <optics>
        <technique_common>
          <perspective><xfov>60</xfov><yfov>45</yfov><znear>0.1</znear><zfar>100</zfar></perspective>
        </technique_common>
      </optics>
    </camera>
  </library_cameras>
  <library_lights>
    <light id="lamp">
      <technique_common>
        <point>
          <color>1 1 0.5</color>
          <constant_attenuation>1</constant_attenuation>
          <linear_attenuation>0</linear_attenuation>
          <quadratic_attenuation>0.1</quadratic_attenuation>
        </point>
      </technique_common>
    </light>
  </library_lights>
  <library_images>
    <image id="brick-img"><init_from>textures/brick.png</init_from></image>
  </library_images>
  <library_effects>
    <effect id="brick-fx">
      <profile_COMMON>
        <newparam sid="brick-surface">
          <surface type="2D"><init_from>brick-img</init_from></surface>
        </newparam>
        <newparam sid="brick-sampler">
          <sampler2D><source>brick-surface</source></sampler2D>
        </newparam>
        <technique sid="common">
          <lambert>
            <diffuse><texture texture="brick-sampler" texcoord="UVMap"/></diffuse>
          </lambert>
        </technique>
      </profile_COMMON>
    </effect>
  </library_effects>
  <library_materials>
    <material id="brick" name="brick"><instance_effect url="#brick-fx"/></material>
  </library_materials>
  <library_geometries>
    <geometry id="quad">
      <mesh>
        <source id="quad-pos">
          <float_array id="quad-pos-array" count="12">0 0 0 1 0 0 1 1 0 0 1 0</float_array>
          <technique_common>
            <accessor source="#quad-pos-array" count="4" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <source id="quad-uv">
          <float_array id="quad-uv-array" count="8">0 0 1 0 1 1 0 1</float_array>
          <technique_common>
            <accessor source="#quad-uv-array" count="4" stride="2">
              <param name="S" type="float"/>
              <param name="T" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <vertices id="quad-vtx"><input semantic="POSITION" source="#quad-pos"/></vertices>
        <polylist count="1" material="mat">
          <input semantic="VERTEX" source="#quad-vtx" offset="0"/>
          <input semantic="TEXCOORD" source="#quad-uv" offset="0" set="0"/>
          <vcount>4</vcount>
          <p>0 1 2 3</p>
        </polylist>
      </mesh>
    </geometry>
  </library_geometries>
  <library_visual_scenes>
    <visual_scene id="scene">
      <node id="camera"><translate>0 0 5</translate><instance_camera url="#cam"/></node>
      <node id="light"><instance_light url="#lamp"/></node>
      <node id="left">
        <translate sid="location">-1 0 0</translate>
        <instance_geometry url="#quad">
          <bind_material>
            <technique_common>
              <instance_material symbol="mat" target="#brick"/>
            </technique_common>
          </bind_material>
        </instance_geometry>
      </node>
      <node id="right">
        <translate>1 0 0</translate>
        <rotate>0 1 0 90</rotate>
        <instance_geometry url="#quad">
          <bind_material>
            <technique_common>
              <instance_material symbol="mat" target="#brick"/>
            </technique_common>
          </bind_material>
        </instance_geometry>
      </node>
    </visual_scene>
  </library_visual_scenes>
  <scene><instance_visual_scene url="#scene"/></scene>
</COLLADA>"##;

fn convert(filters: &[&str], args: &str, dae: &str) -> Result<String> {
    let registry = FilterRegistry::standard();
    let args: Vec<String> = args.split_whitespace().map(Into::into).collect();
    let mut chain = vec![];
    for name in filters {
        let mut f = registry.create(name)?;
        f.set_arguments(&args)?;
        chain.push(f);
    }
    let (rec, log) = SharedRecorder::new();
    let mut head = FilterChain::build(chain, Box::new(rec));
    ColladaImporter::default().import_str(dae, &mut *head)?;
    drop(head);
    let mut w = ClassicWriter::new(vec![]);
    log.borrow().replay(&mut w)?;
    Ok(String::from_utf8(w.into_inner()).unwrap())
}

#[test]
fn textured_scene() {
    let text = convert(&["Appearance"], "-appAndMat", SCENE).unwrap();
    assert!(text.starts_with("#X3D V3.2 utf8\nPROFILE Immersive\n"), "{}", text);
    assert!(text.contains("META \"creator\" \"Ada\""));
    assert!(text.contains("META \"generator\" \"Blender 2.79\""));
    assert!(text.contains("url [ \"textures/brick.png\" ]"));
    assert!(text.contains("Viewpoint {"));
    assert!(text.contains("description \"Front\""));
    assert!(text.contains("PointLight {"));
    assert!(text.contains("attenuation 1 0 0.1"));
    // the second instance of the quad is shared
    assert_eq!(text.matches("DEF quad_0 Shape").count(), 1);
    assert!(text.contains("USE quad_0"));
    // the textured appearance keeps the effect's material and gets no default one
    assert_eq!(text.matches("Material {").count(), 1);
    assert!(!text.contains("0.8 0.8 0.8"));
    // the quad is a single face with shared indices
    assert!(text.contains("coordIndex [ 0 1 2 3 -1 ]"));
    assert!(!text.contains("texCoordIndex"));
}

#[test]
fn face_sets_are_triangulated_downstream() {
    let text = convert(&["IFSToTriangle"], "", SCENE).unwrap();
    assert!(text.contains("TriangleSet {"), "{}", text);
    assert!(!text.contains("IndexedFaceSet"));
}

#[test]
fn broken_references_fail_the_import() {
    let broken = SCENE.replace(r##"url="#quad""##, r##"url="#missing""##);
    let err = convert(&[], "", &broken).unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::InvalidInputFile);
    let err = convert(&[], "", "<COLLADA/>").unwrap_err();
    assert_eq!(err.exit_code(), ExitCode::InvalidInputFile);
}
