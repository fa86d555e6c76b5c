// Corps GLSL sans directive #version : l'en-tête dépend du dialecte.

pub const PARTICLE_SIMULATION_VERT: &str = r#"
layout(location = 0) in vec3 aPosition;
layout(location = 1) in float aDiameter;
layout(location = 2) in vec3 aVelocity;
layout(location = 3) in float aLifetime;

layout(std140) uniform Transform {
    mat4 uModel;
    mat4 uView;
    mat4 uProjection;
    mat3 uNormal;
};

layout(std140) uniform Camera {
    vec4 uEyePosition;
};

uniform float uDeltaTime;

out vec3 vPosition;
out float vDiameter;
out vec3 vVelocity;
out float vLifetime;
out float vFade;

const vec3 GRAVITY = vec3(0.0, -0.98, 0.0);
const float RESPAWN_LIFETIME = 3.0;

void main() {
    vec3 position = aPosition;
    vec3 velocity = aVelocity;
    float lifetime = aLifetime - uDeltaTime;

    if (lifetime <= 0.0) {
        position = vec3(0.0);
        velocity.y = abs(velocity.y);
        lifetime = RESPAWN_LIFETIME;
    } else {
        velocity += GRAVITY * uDeltaTime;
        position += velocity * uDeltaTime;
    }

    vPosition = position;
    vDiameter = aDiameter;
    vVelocity = velocity;
    vLifetime = lifetime;

    vec4 world = uModel * vec4(position, 1.0);
    float dist = max(distance(world.xyz, uEyePosition.xyz), 0.001);
    gl_Position = uProjection * uView * world;
    gl_PointSize = aDiameter * 100.0 / dist;
    vFade = clamp(lifetime / RESPAWN_LIFETIME, 0.0, 1.0);
}
"#;

pub const PARTICLE_SPRITE_FRAG: &str = r#"
in float vFade;

layout(std140) uniform Light {
    vec4 uAmbient;
    vec4 uDiffuse;
    vec4 uSpecular;
    vec4 uDirection;
    vec4 uLightPosition;
    vec4 uAttenuation;
    vec4 uSpot;
    vec4 uSpotCutoff;
};

layout(std140) uniform Material {
    vec4 uMatAmbient;
    vec4 uMatDiffuse;
    vec4 uMatSpecular;
    float uShininess;
};

uniform sampler2D uSprite;

out vec4 fragColor;

void main() {
    vec2 coord = gl_PointCoord * 2.0 - 1.0;
    float r2 = dot(coord, coord);
    if (r2 > 1.0) {
        discard;
    }

    // Normale d'une sphère imposteur
    vec3 normal = vec3(coord.x, -coord.y, sqrt(1.0 - r2));
    vec3 L = normalize(-uDirection.xyz);
    float diffuse = max(dot(normal, L), 0.0);
    vec3 H = normalize(L + vec3(0.0, 0.0, 1.0));
    float specular = pow(max(dot(normal, H), 0.0), max(uShininess, 1.0));

    vec3 color = uAmbient.rgb * uMatAmbient.rgb
        + diffuse * uDiffuse.rgb * uMatDiffuse.rgb
        + specular * uSpecular.rgb * uMatSpecular.rgb;

    vec4 sprite = texture(uSprite, gl_PointCoord);
    fragColor = vec4(color * sprite.rgb, sprite.a * vFade);
}
"#;

pub const STATIC_POINTS_VERT: &str = r#"
layout(location = 0) in vec3 aPosition;
layout(location = 1) in float aDiameter;

layout(std140) uniform Transform {
    mat4 uModel;
    mat4 uView;
    mat4 uProjection;
    mat3 uNormal;
};

void main() {
    gl_Position = uProjection * uView * uModel * vec4(aPosition, 1.0);
    gl_PointSize = max(aDiameter * 40.0, 1.0);
}
"#;

pub const STATIC_POINTS_FRAG: &str = r#"
layout(std140) uniform Material {
    vec4 uMatAmbient;
    vec4 uMatDiffuse;
    vec4 uMatSpecular;
    float uShininess;
};

out vec4 fragColor;

void main() {
    fragColor = vec4(uMatDiffuse.rgb, 1.0);
}
"#;
